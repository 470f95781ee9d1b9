use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Reference to audio a session has ready for retrieval.
///
/// `fingerprint` is the session's freshness token: two handles with the same fingerprint
/// refer to the same audio. `generation` is stamped by the supervisor and ties the handle
/// to the session instance that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactHandle {
    pub id: String,
    pub fingerprint: String,
    pub generation: u64,
}

impl ArtifactHandle {
    pub fn new(id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fingerprint: fingerprint.into(),
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session cannot be used any more and must be replaced
    #[error("session is no longer usable: {0}")]
    Fatal(String),
    #[error("timed out after {0:?} waiting for an artifact")]
    TimedOut(Duration),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("session is not ready")]
    NotReady,
    #[error("artifact handle belongs to an earlier session")]
    StaleHandle,
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Fatal(_))
    }
}

/// One stateful connection to an external speech synthesizer.
///
/// Implementations are responsible for:
/// - Accepting one text at a time and producing audio for the latest submission
/// - Supplying a fingerprint that tells fresh audio apart from audio already handed out
/// - Classifying their failures: `Fatal` only when the session itself is broken
///
/// Callers never use a session concurrently.
#[async_trait]
pub trait SynthesisSession: Send {
    /// Hand `text` to the synthesizer
    async fn submit(&mut self, text: &str) -> Result<(), SessionError>;

    /// Wait up to `timeout` for audio to become available
    async fn await_artifact(&mut self, timeout: Duration) -> Result<ArtifactHandle, SessionError>;

    /// Raw bytes of the audio behind `handle`
    async fn fetch(&mut self, handle: &ArtifactHandle) -> Result<Vec<u8>, SessionError>;

    /// Release everything the session holds. Called once, on every exit path.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Builds fresh sessions; the only way a supervisor obtains one
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Provider name used in logs
    fn provider(&self) -> &str;

    async fn create(&self) -> Result<Box<dyn SynthesisSession>, SessionError>;
}
