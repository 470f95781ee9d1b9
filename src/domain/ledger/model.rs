use crate::domain::chunking::TextChunk;
use serde::Serialize;
use std::path::PathBuf;

/// Where a chunk sits in the per-chunk state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    Submitted,
    AwaitingArtifact,
    Validating,
    Complete,
    Failed,
}

/// A chunk that still needs an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkJob {
    pub index: usize,
    pub text: String,
    pub status: ChunkStatus,
}

impl From<TextChunk> for ChunkJob {
    fn from(chunk: TextChunk) -> Self {
        Self {
            index: chunk.index,
            text: chunk.text,
            status: ChunkStatus::Pending,
        }
    }
}

/// A validated artifact under its final name. Its presence on disk is what marks the
/// chunk as done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub index: usize,
    pub temporary_path: PathBuf,
    pub final_path: PathBuf,
}

impl DownloadResult {
    /// Result for a file that was already in place before this run
    pub fn existing(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            temporary_path: path.clone(),
            final_path: path,
        }
    }
}

/// Output of [`JobLedger::plan`](super::JobLedger::plan)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerPlan {
    pub pending: Vec<ChunkJob>,
    pub already_done: Vec<DownloadResult>,
}

impl LedgerPlan {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_indices(&self) -> Vec<usize> {
        self.pending.iter().map(|job| job.index).collect()
    }
}
