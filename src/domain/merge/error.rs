use crate::infrastructure::codec::CodecError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("only {found} of {expected} chunks are present, missing {missing:?}")]
    IncompleteSet {
        expected: usize,
        found: usize,
        missing: Vec<usize>,
    },
    #[error("chunk results outside the expected set: {indices:?}")]
    UnexpectedChunks { indices: Vec<usize> },
    #[error("nothing to merge")]
    NothingToMerge,
    #[error("chunk {index} cannot be decoded: {reason}")]
    Corrupt { index: usize, reason: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Indices the caller has to produce (or fix) before merging can succeed
    pub fn offending_indices(&self) -> Vec<usize> {
        match self {
            MergeError::IncompleteSet { missing, .. } => missing.clone(),
            MergeError::UnexpectedChunks { indices } => indices.clone(),
            MergeError::Corrupt { index, .. } => vec![*index],
            _ => Vec::new(),
        }
    }
}
