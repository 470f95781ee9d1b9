use super::error::SupervisorError;
use super::events::{EventSink, RunEvent};
use crate::infrastructure::sessions::{ArtifactHandle, SessionError, SessionFactory, SynthesisSession};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the one synthesis session a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Degraded,
    Restarting,
    Closed,
}

/// Proof that the session was ready at some point. Operations made with a handle from
/// before a restart fail with [`SessionError::NotReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    generation: u64,
}

/// Owns the synthesis session: creates it lazily, replaces it after fatal errors within
/// a restart budget, and closes it at the end of the run.
pub struct SessionSupervisor {
    factory: Arc<dyn SessionFactory>,
    session: Option<Box<dyn SynthesisSession>>,
    state: SessionState,
    generation: u64,
    restarts: u32,
    max_restarts: u32,
    last_fault: Option<String>,
    events: Arc<dyn EventSink>,
}

impl SessionSupervisor {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        max_restarts: u32,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            factory,
            session: None,
            state: SessionState::Uninitialized,
            generation: 0,
            restarts: 0,
            max_restarts,
            last_fault: None,
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Restarts performed so far in this run
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Return a handle to a ready session, creating or replacing it as needed.
    ///
    /// A failed creation counts against the restart budget just like a fatal error.
    pub async fn ensure_ready(&mut self) -> Result<SessionHandle, SupervisorError> {
        loop {
            match self.state {
                SessionState::Ready => {
                    return Ok(SessionHandle {
                        generation: self.generation,
                    })
                }
                SessionState::Closed => return Err(SupervisorError::Closed),
                SessionState::Uninitialized => {
                    if let Err(e) = self.start().await {
                        self.degrade(e.to_string());
                    }
                }
                SessionState::Degraded | SessionState::Restarting => {
                    let reason = self
                        .last_fault
                        .clone()
                        .unwrap_or_else(|| "unknown session fault".to_string());

                    if self.restarts >= self.max_restarts {
                        return Err(SupervisorError::RestartBudgetExhausted {
                            max_restarts: self.max_restarts,
                            reason,
                        });
                    }

                    self.state = SessionState::Restarting;
                    self.teardown().await;
                    self.restarts += 1;

                    match self.start().await {
                        Ok(()) => self.events.emit(&RunEvent::SessionRestarted {
                            provider: self.factory.provider().to_string(),
                            generation: self.generation,
                            restarts: self.restarts,
                            reason,
                        }),
                        Err(e) => self.degrade(e.to_string()),
                    }
                }
            }
        }
    }

    pub async fn submit(&mut self, handle: SessionHandle, text: &str) -> Result<(), SessionError> {
        self.active(handle)?.submit(text).await
    }

    /// Wait for the session's next artifact, never longer than `timeout`
    pub async fn await_artifact(
        &mut self,
        handle: SessionHandle,
        timeout: Duration,
    ) -> Result<ArtifactHandle, SessionError> {
        let generation = self.generation;
        let session = self.active(handle)?;

        let mut artifact = tokio::time::timeout(timeout, session.await_artifact(timeout))
            .await
            .map_err(|_| SessionError::TimedOut(timeout))??;
        artifact.generation = generation;
        Ok(artifact)
    }

    pub async fn fetch(&mut self, artifact: &ArtifactHandle) -> Result<Vec<u8>, SessionError> {
        if artifact.generation != self.generation {
            return Err(SessionError::StaleHandle);
        }
        let handle = SessionHandle {
            generation: artifact.generation,
        };
        self.active(handle)?.fetch(artifact).await
    }

    /// Report that the session is unusable; the next `ensure_ready` replaces it
    pub fn mark_fatal(&mut self, reason: &str) {
        if self.state == SessionState::Ready {
            tracing::warn!(
                generation = self.generation,
                reason = %reason,
                "Synthesis session marked unusable"
            );
            self.degrade(reason.to_string());
        }
    }

    /// Tear the session down. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.teardown().await;
        self.state = SessionState::Closed;
        tracing::debug!(restarts = self.restarts, "Session supervisor closed");
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        let session = self.factory.create().await?;
        self.session = Some(session);
        self.generation += 1;
        self.state = SessionState::Ready;
        self.last_fault = None;
        self.events.emit(&RunEvent::SessionStarted {
            provider: self.factory.provider().to_string(),
            generation: self.generation,
        });
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!(
                    generation = self.generation,
                    error = %e,
                    "Ignoring error while closing synthesis session"
                );
            }
        }
    }

    fn degrade(&mut self, reason: String) {
        self.state = SessionState::Degraded;
        self.last_fault = Some(reason);
    }

    fn active(
        &mut self,
        handle: SessionHandle,
    ) -> Result<&mut Box<dyn SynthesisSession>, SessionError> {
        if self.state != SessionState::Ready || handle.generation != self.generation {
            return Err(SessionError::NotReady);
        }
        self.session.as_mut().ok_or(SessionError::NotReady)
    }
}

impl Drop for SessionSupervisor {
    /// A supervisor dropped before `close` (a cancelled run) still closes its session,
    /// on the runtime it was driven from.
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let generation = self.generation;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(
                            generation,
                            error = %e,
                            "Ignoring error while closing abandoned synthesis session"
                        );
                    }
                });
            }
            Err(_) => tracing::warn!(
                generation,
                "Synthesis session dropped outside a runtime and was not closed"
            ),
        }
    }
}
