use crate::domain::synthesis::FailedChunk;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// What a `plan` invocation found, without touching any session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total: usize,
    pub pending: Vec<usize>,
    pub already_done: Vec<usize>,
}

/// Outcome of one run, printed at the end whether the run finished or was aborted
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub provider: String,
    pub output_dir: PathBuf,
    pub expected: usize,
    /// Chunks present on disk after the run
    pub completed: usize,
    /// Chunks that were present before the run started
    pub already_done: usize,
    /// Indices synthesized during this run
    pub newly_completed: Vec<usize>,
    pub missing: Vec<usize>,
    pub failed: Vec<FailedChunk>,
    pub restarts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new(provider: &str, output_dir: PathBuf, expected: usize, already_done: usize) -> Self {
        let now = Utc::now();
        Self {
            provider: provider.to_string(),
            output_dir,
            expected,
            completed: already_done,
            already_done,
            newly_completed: Vec::new(),
            missing: Vec::new(),
            failed: Vec::new(),
            restarts: 0,
            aborted: None,
            merged: None,
            merge_error: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Every chunk is on disk and the final file was written
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.merged.is_some()
    }

    pub fn log_summary(&self) {
        let elapsed = (self.finished_at - self.started_at).num_seconds();

        if self.is_complete() {
            tracing::info!(
                completed = self.completed,
                expected = self.expected,
                restarts = self.restarts,
                elapsed_secs = elapsed,
                merged = ?self.merged,
                "Run finished"
            );
            return;
        }

        tracing::warn!(
            completed = self.completed,
            expected = self.expected,
            missing = ?self.missing,
            failed = self.failed.len(),
            restarts = self.restarts,
            aborted = ?self.aborted,
            merge_error = ?self.merge_error,
            elapsed_secs = elapsed,
            "Run incomplete, re-run with the same input and output directory to resume"
        );
    }
}
