use longform_tts::domain::narration::NarrationService;
use longform_tts::infrastructure::codec::WavCodec;
use longform_tts::infrastructure::config::RunSettings;
use longform_tts::infrastructure::sessions::SessionFactory;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;

pub mod fake_session;
pub mod fixtures;
pub mod recording_sink;

pub use fake_session::{FakeFactory, Step};
use recording_sink::RecordingSink;

/// Five sentences that each become their own chunk at `max_length = 20`
pub const FIVE_CHUNKS: &str = "Chunk one is here. Chunk two is here.\n\nChunk three is here. \
                               Chunk four is here.   Chunk five is here.";

/// A fresh output directory and event recorder per test
pub struct PipelineContext {
    dir: TempDir,
    pub events: Arc<RecordingSink>,
}

impl AsyncTestContext for PipelineContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            Self {
                dir: tempfile::tempdir().expect("Failed to create temp dir"),
                events: Arc::new(RecordingSink::default()),
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // TempDir removes the output directory on drop
        }
    }
}

#[allow(dead_code)]
impl PipelineContext {
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.output_dir().join(format!("chunk_{index:02}.wav"))
    }

    pub fn final_path(&self) -> PathBuf {
        self.output_dir().join("final.wav")
    }

    /// Settings with no waiting, so scripted runs finish instantly
    pub fn settings(&self) -> RunSettings {
        RunSettings {
            max_length: 20,
            filename_template: "chunk_{index:02}.wav".to_string(),
            final_filename: "final.wav".to_string(),
            inter_chunk_delay: Duration::ZERO,
            max_attempts: 2,
            max_restarts: 3,
            artifact_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1),
        }
    }

    pub fn service(&self, factory: Arc<dyn SessionFactory>, settings: RunSettings) -> NarrationService {
        NarrationService::new(
            factory,
            Arc::new(WavCodec::new()),
            settings,
            self.events.clone(),
        )
    }
}
