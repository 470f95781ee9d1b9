use super::error::LedgerError;
use super::model::{ChunkJob, DownloadResult, LedgerPlan};
use super::template::NameTemplate;
use crate::domain::chunking::TextChunk;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PARTIAL_PREFIX: &str = ".chunk-";
const PARTIAL_SUFFIX: &str = ".tmp";

/// The output directory seen as a durable record of finished chunks.
///
/// A chunk is done exactly when a file with its canonical name exists. Nothing else is
/// persisted, so re-running with the same directory resumes where the last run stopped.
#[derive(Debug, Clone)]
pub struct JobLedger {
    output_dir: PathBuf,
    template: NameTemplate,
    extension: String,
}

impl JobLedger {
    pub fn new(output_dir: impl Into<PathBuf>, template: NameTemplate, extension: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            template,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn canonical_name(&self, index: usize) -> String {
        self.template.file_name(index, &self.extension)
    }

    pub fn canonical_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(self.canonical_name(index))
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.canonical_path(index).is_file()
    }

    /// Split `chunks` into those still to synthesize and those already on disk.
    /// Only reads the directory.
    pub fn plan(&self, chunks: &[TextChunk]) -> LedgerPlan {
        let mut plan = LedgerPlan::default();

        for chunk in chunks {
            let path = self.canonical_path(chunk.index);
            if path.is_file() {
                tracing::debug!(chunk_index = chunk.index, path = %path.display(), "Chunk already done");
                plan.already_done.push(DownloadResult::existing(chunk.index, path));
            } else {
                plan.pending.push(ChunkJob::from(chunk.clone()));
            }
        }

        tracing::info!(
            total = chunks.len(),
            pending = plan.pending.len(),
            already_done = plan.already_done.len(),
            "Ledger planned"
        );

        plan
    }

    /// Re-derive the finished set for indices `1..=expected` from disk
    pub fn completed(&self, expected: usize) -> Vec<DownloadResult> {
        (1..=expected)
            .filter_map(|index| {
                let path = self.canonical_path(index);
                path.is_file().then(|| DownloadResult::existing(index, path))
            })
            .collect()
    }

    pub fn missing(&self, expected: usize) -> Vec<usize> {
        (1..=expected).filter(|index| !self.is_done(*index)).collect()
    }

    pub fn ensure_output_dir(&self) -> Result<(), LedgerError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| LedgerError::io(&self.output_dir, e))
    }

    /// A fresh, unique path for materializing an artifact before validation.
    /// Never collides with a canonical name.
    pub fn temporary_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!(
            "{PARTIAL_PREFIX}{index}-{}{PARTIAL_SUFFIX}",
            Uuid::new_v4().simple()
        ))
    }

    /// Move a validated temporary file under the canonical name for `index`.
    ///
    /// If that name is taken, `_1`, `_2`, ... is inserted before the extension until a
    /// free name is found; an existing file is never overwritten.
    pub fn place(&self, index: usize, temporary_path: &Path) -> Result<DownloadResult, LedgerError> {
        let destination = self.canonical_path(index);
        let final_path = free_name(&destination);

        if final_path != destination {
            tracing::warn!(
                chunk_index = index,
                canonical = %destination.display(),
                placed = %final_path.display(),
                "Canonical name taken, using suffixed name"
            );
        }

        std::fs::rename(temporary_path, &final_path)
            .map_err(|e| LedgerError::io(temporary_path, e))?;

        Ok(DownloadResult {
            index,
            temporary_path: temporary_path.to_path_buf(),
            final_path,
        })
    }

    /// Delete temporary files left behind by an interrupted run
    pub fn sweep_partials(&self) -> Result<usize, LedgerError> {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(LedgerError::io(&self.output_dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| LedgerError::io(&self.output_dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)) {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Could not remove partial file")
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Removed partial files from an earlier run");
        }
        Ok(removed)
    }
}

fn free_name(destination: &Path) -> PathBuf {
    if !destination.exists() {
        return destination.to_path_buf();
    }

    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = destination
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|counter| destination.with_file_name(format!("{stem}_{counter}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| destination.to_path_buf())
}
