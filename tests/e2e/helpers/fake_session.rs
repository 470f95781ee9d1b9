use super::fixtures::wav_bytes;
use async_trait::async_trait;
use longform_tts::infrastructure::sessions::{
    ArtifactHandle, SessionError, SessionFactory, SynthesisSession,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// What the fake session does on one `await_artifact` call. Once the script runs out,
/// every call produces fresh audio.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fresh, valid audio whose samples all equal the number of audios produced so far
    Audio,
    /// Fresh bytes that are not a WAV file
    Corrupt,
    /// The session dies
    Fatal,
    /// Nothing arrives in time
    Timeout,
    /// The previous artifact is offered again
    Repeat,
}

/// State shared by every session one factory creates
#[derive(Default)]
pub struct FakeState {
    script: Mutex<VecDeque<Step>>,
    submitted: Mutex<Vec<String>>,
    produced: Mutex<i16>,
    last_fingerprint: Mutex<Option<String>>,
    created: Mutex<u32>,
    closed: Mutex<u32>,
}

#[allow(dead_code)]
impl FakeState {
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    pub fn created(&self) -> u32 {
        *self.created.lock()
    }

    pub fn closed(&self) -> u32 {
        *self.closed.lock()
    }
}

pub struct FakeFactory {
    state: Arc<FakeState>,
}

impl FakeFactory {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        let state = FakeState::default();
        *state.script.lock() = script.into();
        Arc::new(Self {
            state: Arc::new(state),
        })
    }

    pub fn state(&self) -> Arc<FakeState> {
        self.state.clone()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn create(&self) -> Result<Box<dyn SynthesisSession>, SessionError> {
        *self.state.created.lock() += 1;
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            ready: HashMap::new(),
        }))
    }
}

pub struct FakeSession {
    state: Arc<FakeState>,
    ready: HashMap<String, Vec<u8>>,
}

impl FakeSession {
    fn produce(&mut self, bytes: Vec<u8>) -> ArtifactHandle {
        let mut produced = self.state.produced.lock();
        *produced += 1;
        let fingerprint = format!("artifact-{}", *produced);

        self.ready.insert(fingerprint.clone(), bytes);
        *self.state.last_fingerprint.lock() = Some(fingerprint.clone());
        ArtifactHandle::new(fingerprint.clone(), fingerprint)
    }

    fn next_audio_value(&self) -> i16 {
        *self.state.produced.lock() + 1
    }
}

#[async_trait]
impl SynthesisSession for FakeSession {
    async fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        self.state.submitted.lock().push(text.to_string());
        Ok(())
    }

    async fn await_artifact(&mut self, timeout: Duration) -> Result<ArtifactHandle, SessionError> {
        let step = self.state.script.lock().pop_front().unwrap_or(Step::Audio);
        let repeated = self.state.last_fingerprint.lock().clone();

        match (step, repeated) {
            (Step::Repeat, Some(fingerprint)) => Ok(ArtifactHandle::new(fingerprint.clone(), fingerprint)),
            (Step::Audio | Step::Repeat, _) => {
                let value = self.next_audio_value();
                Ok(self.produce(wav_bytes(value)))
            }
            (Step::Corrupt, _) => Ok(self.produce(b"RIFF\x10\x00\x00\x00WAVEjunk".to_vec())),
            (Step::Fatal, _) => Err(SessionError::Fatal("fake session crashed".to_string())),
            (Step::Timeout, _) => Err(SessionError::TimedOut(timeout)),
        }
    }

    async fn fetch(&mut self, handle: &ArtifactHandle) -> Result<Vec<u8>, SessionError> {
        self.ready
            .remove(&handle.fingerprint)
            .ok_or_else(|| SessionError::Rejected(format!("unknown artifact {}", handle.id)))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        *self.state.closed.lock() += 1;
        Ok(())
    }
}
