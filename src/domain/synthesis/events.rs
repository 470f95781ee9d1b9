use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Progress of a run, as reported to whoever is watching
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunPlanned {
        total: usize,
        pending: usize,
        already_done: usize,
    },
    SessionStarted {
        provider: String,
        generation: u64,
    },
    SessionRestarted {
        provider: String,
        generation: u64,
        restarts: u32,
        reason: String,
    },
    ChunkStarted {
        index: usize,
        attempt: u32,
    },
    StaleArtifactIgnored {
        index: usize,
        fingerprint: String,
    },
    ChunkRetrying {
        index: usize,
        attempt: u32,
        reason: String,
    },
    ChunkCompleted {
        index: usize,
        path: PathBuf,
    },
    ChunkFailed {
        index: usize,
        attempts: u32,
        reason: String,
    },
    RunAborted {
        reason: String,
    },
    MergeCompleted {
        path: PathBuf,
        chunks: usize,
    },
    MergeSkipped {
        missing: Vec<usize>,
    },
    MergeFailed {
        reason: String,
    },
}

/// Destination for run events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::RunPlanned {
                total,
                pending,
                already_done,
            } => tracing::info!(total, pending, already_done, "Run planned"),
            RunEvent::SessionStarted {
                provider,
                generation,
            } => tracing::info!(provider = %provider, generation, "Synthesis session started"),
            RunEvent::SessionRestarted {
                provider,
                generation,
                restarts,
                reason,
            } => tracing::warn!(
                provider = %provider,
                generation,
                restarts,
                reason = %reason,
                "Synthesis session restarted"
            ),
            RunEvent::ChunkStarted { index, attempt } => {
                tracing::info!(chunk_index = index, attempt, "Chunk started")
            }
            RunEvent::StaleArtifactIgnored { index, fingerprint } => tracing::warn!(
                chunk_index = index,
                fingerprint = %fingerprint,
                "Ignoring artifact already consumed"
            ),
            RunEvent::ChunkRetrying {
                index,
                attempt,
                reason,
            } => tracing::warn!(chunk_index = index, attempt, reason = %reason, "Chunk attempt failed, retrying"),
            RunEvent::ChunkCompleted { index, path } => {
                tracing::info!(chunk_index = index, path = %path.display(), "Chunk completed")
            }
            RunEvent::ChunkFailed {
                index,
                attempts,
                reason,
            } => tracing::error!(chunk_index = index, attempts, reason = %reason, "Chunk failed"),
            RunEvent::RunAborted { reason } => tracing::error!(reason = %reason, "Run aborted"),
            RunEvent::MergeCompleted { path, chunks } => {
                tracing::info!(path = %path.display(), chunks, "Merge completed")
            }
            RunEvent::MergeSkipped { missing } => {
                tracing::warn!(missing = ?missing, "Merge skipped, chunks missing")
            }
            RunEvent::MergeFailed { reason } => tracing::error!(reason = %reason, "Merge failed"),
        }
    }
}

/// Forwards every event to each inner sink in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
