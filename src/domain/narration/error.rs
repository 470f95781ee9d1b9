use crate::domain::ledger::LedgerError;
use crate::domain::merge::MergeError;
use crate::infrastructure::config::ConfigError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("cannot read input {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("input {path:?} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}
