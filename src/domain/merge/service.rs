use super::error::MergeError;
use crate::domain::ledger::DownloadResult;
use crate::infrastructure::codec::{AudioCodec, CodecError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Concatenates finished chunks into the final file, all or nothing
pub struct Merger {
    codec: Arc<dyn AudioCodec>,
}

impl Merger {
    pub fn new(codec: Arc<dyn AudioCodec>) -> Self {
        Self { codec }
    }

    /// Merge `results` for indices `1..=expected_count` into `output_dir/final_name`.
    ///
    /// Results may come in any order. When the set is incomplete nothing is written.
    /// The output is first written to a temporary file and renamed over `final_name`,
    /// so a failure never leaves a truncated merge behind.
    pub fn merge(
        &self,
        output_dir: &Path,
        results: &[DownloadResult],
        expected_count: usize,
        final_name: &str,
    ) -> Result<PathBuf, MergeError> {
        if expected_count == 0 {
            return Err(MergeError::NothingToMerge);
        }

        let ordered = order(results, expected_count)?;
        let paths: Vec<PathBuf> = ordered.values().map(|r| r.final_path.clone()).collect();

        for (index, result) in &ordered {
            self.codec
                .decode_validate(&result.final_path)
                .map_err(|e| MergeError::Corrupt {
                    index: *index,
                    reason: e.to_string(),
                })?;
        }

        let audio = self
            .codec
            .concat(&paths)
            .map_err(|e| attribute(e, &ordered))?;

        let destination = output_dir.join(final_name);
        let staging = output_dir.join(format!(".merge-{}.tmp", Uuid::new_v4().simple()));

        let written = std::fs::write(&staging, &audio)
            .and_then(|()| std::fs::rename(&staging, &destination));
        if let Err(source) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(MergeError::Io {
                path: destination,
                source,
            });
        }

        tracing::info!(
            path = %destination.display(),
            chunks = ordered.len(),
            bytes = audio.len(),
            "Chunks merged"
        );

        Ok(destination)
    }
}

/// Index the results by chunk number, checking they are exactly `1..=expected`
fn order(
    results: &[DownloadResult],
    expected: usize,
) -> Result<BTreeMap<usize, &DownloadResult>, MergeError> {
    let mut ordered = BTreeMap::new();
    let mut unexpected = Vec::new();

    for result in results {
        if result.index == 0 || result.index > expected {
            unexpected.push(result.index);
        } else if ordered.insert(result.index, result).is_some() {
            unexpected.push(result.index);
        }
    }

    let missing: Vec<usize> = (1..=expected)
        .filter(|index| !ordered.contains_key(index))
        .collect();
    if !missing.is_empty() {
        return Err(MergeError::IncompleteSet {
            expected,
            found: ordered.len(),
            missing,
        });
    }

    if !unexpected.is_empty() {
        unexpected.sort_unstable();
        unexpected.dedup();
        return Err(MergeError::UnexpectedChunks {
            indices: unexpected,
        });
    }

    Ok(ordered)
}

/// Turn a codec error that names a file back into the chunk it belongs to
fn attribute(error: CodecError, ordered: &BTreeMap<usize, &DownloadResult>) -> MergeError {
    let path = match &error {
        CodecError::Corrupt { path, .. } | CodecError::FormatMismatch { path, .. } => path,
        _ => return MergeError::Codec(error),
    };

    match ordered.iter().find(|(_, r)| &r.final_path == path) {
        Some((index, _)) => MergeError::Corrupt {
            index: *index,
            reason: error.to_string(),
        },
        None => MergeError::Codec(error),
    }
}
