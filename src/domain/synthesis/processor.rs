use super::error::SupervisorError;
use super::events::{EventSink, RunEvent};
use super::supervisor::{SessionHandle, SessionSupervisor};
use crate::domain::ledger::{ChunkJob, ChunkStatus, DownloadResult, JobLedger, LedgerError};
use crate::infrastructure::codec::{AudioCodec, CodecError};
use crate::infrastructure::sessions::{ArtifactHandle, SessionError};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorSettings {
    /// Upper bound on waiting for one chunk's artifact
    pub artifact_timeout: Duration,
    /// Total attempts per chunk before it is marked failed
    pub max_attempts: u32,
    /// Pause before asking again after a stale artifact
    pub poll_interval: Duration,
}

/// A chunk given up on after exhausting its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedChunk {
    pub index: usize,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Completed(DownloadResult),
    Failed(FailedChunk),
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("artifact failed validation: {0}")]
    Corrupt(#[from] CodecError),
    #[error("cannot write artifact to {path:?}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AttemptError {
    fn is_fatal(&self) -> bool {
        matches!(self, AttemptError::Session(e) if e.is_fatal())
    }
}

/// Drives chunks through submit, await, validate and place, one at a time.
///
/// Corrupt artifacts and timeouts use up the chunk's attempts. Fatal session errors do
/// not: they go to the supervisor and the same chunk starts over on the new session.
/// Fingerprints of every artifact seen are remembered for the whole run, so audio left
/// over from an earlier chunk is never attributed to a later one.
pub struct ChunkProcessor {
    ledger: JobLedger,
    codec: Arc<dyn AudioCodec>,
    settings: ProcessorSettings,
    consumed: HashSet<String>,
    events: Arc<dyn EventSink>,
}

impl ChunkProcessor {
    pub fn new(
        ledger: JobLedger,
        codec: Arc<dyn AudioCodec>,
        settings: ProcessorSettings,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ledger,
            codec,
            settings,
            consumed: HashSet::new(),
            events,
        }
    }

    /// Run `job` to a terminal state.
    ///
    /// Returns an error only when the supervisor can no longer provide a session, in
    /// which case the job is left `Pending` and nothing for it is on disk.
    pub async fn process(
        &mut self,
        supervisor: &mut SessionSupervisor,
        job: &mut ChunkJob,
    ) -> Result<ChunkOutcome, SupervisorError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempts = 0u32;

        loop {
            job.status = ChunkStatus::Pending;
            let handle = supervisor.ensure_ready().await?;

            attempts += 1;
            self.events.emit(&RunEvent::ChunkStarted {
                index: job.index,
                attempt: attempts,
            });

            let error = match self.attempt(supervisor, handle, job).await {
                Ok(result) => {
                    job.status = ChunkStatus::Complete;
                    self.events.emit(&RunEvent::ChunkCompleted {
                        index: job.index,
                        path: result.final_path.clone(),
                    });
                    return Ok(ChunkOutcome::Completed(result));
                }
                Err(e) => e,
            };

            if error.is_fatal() {
                attempts -= 1;
                supervisor.mark_fatal(&error.to_string());
                continue;
            }

            if attempts >= max_attempts {
                job.status = ChunkStatus::Failed;
                let failed = FailedChunk {
                    index: job.index,
                    attempts,
                    reason: error.to_string(),
                };
                self.events.emit(&RunEvent::ChunkFailed {
                    index: failed.index,
                    attempts: failed.attempts,
                    reason: failed.reason.clone(),
                });
                return Ok(ChunkOutcome::Failed(failed));
            }

            self.events.emit(&RunEvent::ChunkRetrying {
                index: job.index,
                attempt: attempts,
                reason: error.to_string(),
            });
        }
    }

    async fn attempt(
        &mut self,
        supervisor: &mut SessionSupervisor,
        handle: SessionHandle,
        job: &mut ChunkJob,
    ) -> Result<DownloadResult, AttemptError> {
        supervisor.submit(handle, &job.text).await?;
        job.status = ChunkStatus::Submitted;
        tracing::debug!(chunk_index = job.index, text_length = job.text.len(), "Chunk submitted");

        job.status = ChunkStatus::AwaitingArtifact;
        let artifact = self.await_fresh_artifact(supervisor, handle, job.index).await?;
        let bytes = supervisor.fetch(&artifact).await?;

        job.status = ChunkStatus::Validating;
        let temporary_path = self.ledger.temporary_path(job.index);
        if let Err(source) = tokio::fs::write(&temporary_path, &bytes).await {
            discard(&temporary_path).await;
            return Err(AttemptError::Write {
                path: temporary_path,
                source,
            });
        }

        if let Err(e) = self.codec.decode_validate(&temporary_path) {
            discard(&temporary_path).await;
            return Err(e.into());
        }

        match self.ledger.place(job.index, &temporary_path) {
            Ok(result) => Ok(result),
            Err(e) => {
                // rename failed, so the temporary file is still ours
                discard(&temporary_path).await;
                Err(e.into())
            }
        }
    }

    /// Wait for an artifact whose fingerprint was never seen before in this run.
    /// Stale artifacts are skipped without extending the deadline.
    async fn await_fresh_artifact(
        &mut self,
        supervisor: &mut SessionSupervisor,
        handle: SessionHandle,
        index: usize,
    ) -> Result<ArtifactHandle, SessionError> {
        let timeout = self.settings.artifact_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::TimedOut(timeout));
            }

            let artifact = supervisor.await_artifact(handle, remaining).await?;
            if self.consumed.insert(artifact.fingerprint.clone()) {
                return Ok(artifact);
            }

            self.events.emit(&RunEvent::StaleArtifactIgnored {
                index,
                fingerprint: artifact.fingerprint,
            });
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.settings.poll_interval.min(remaining)).await;
        }
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not delete rejected artifact")
        }
    }
}
