use crate::domain::ledger::LedgerError;
use crate::domain::merge::MergeError;
use crate::domain::narration::NarrationError;
use crate::infrastructure::config::ConfigError;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    BadInput(String),

    #[error("Run incomplete: {completed} of {expected} chunks, missing {missing:?}")]
    Incomplete {
        completed: usize,
        expected: usize,
        missing: Vec<usize>,
    },

    #[error("Merge failed: {0}")]
    Merge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::BadInput(_) => 2,
            Self::Incomplete { .. } => 3,
            Self::Merge(_) => 4,
            Self::Internal(_) => 1,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidTemplate { .. } => AppError::Config(err.to_string()),
            LedgerError::Io { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<MergeError> for AppError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::IncompleteSet {
                expected,
                found,
                missing,
            } => AppError::Incomplete {
                completed: found,
                expected,
                missing,
            },
            other => AppError::Merge(other.to_string()),
        }
    }
}

impl From<NarrationError> for AppError {
    fn from(err: NarrationError) -> Self {
        match err {
            NarrationError::EmptyInput
            | NarrationError::Input { .. }
            | NarrationError::NotUtf8 { .. } => AppError::BadInput(err.to_string()),
            NarrationError::Config(e) => e.into(),
            NarrationError::Ledger(e) => e.into(),
            NarrationError::Merge(e) => e.into(),
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
