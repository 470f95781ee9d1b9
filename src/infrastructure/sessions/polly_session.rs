use super::synthesis_session::{ArtifactHandle, SessionError, SessionFactory, SynthesisSession};
use crate::domain::tts::{detect_language, is_voice_neural_compatible};
use crate::infrastructure::codec::wrap_pcm16;
use async_trait::async_trait;
use aws_sdk_polly::{
    error::SdkError,
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Polly returns raw PCM at this rate when asked for `OutputFormat::Pcm`
const PCM_SAMPLE_RATE: u32 = 16_000;

/// Creates Polly-backed sessions sharing one client
pub struct PollySessionFactory {
    polly_client: Arc<PollyClient>,
    voice: Option<String>,
}

impl PollySessionFactory {
    pub fn new(polly_client: Arc<PollyClient>, voice: Option<String>) -> Self {
        Self {
            polly_client,
            voice,
        }
    }
}

#[async_trait]
impl SessionFactory for PollySessionFactory {
    fn provider(&self) -> &str {
        "polly"
    }

    async fn create(&self) -> Result<Box<dyn SynthesisSession>, SessionError> {
        Ok(Box::new(PollySession::new(
            self.polly_client.clone(),
            self.voice.clone(),
        )))
    }
}

/// AWS Polly as a synthesis session.
///
/// Polly is stateless, so submission only records the text and the request is made
/// while awaiting the artifact. Every response is fresh; fingerprints are random.
pub struct PollySession {
    polly_client: Arc<PollyClient>,
    voice: Option<String>,
    submitted: Option<String>,
    artifacts: HashMap<String, Vec<u8>>,
}

impl PollySession {
    pub fn new(polly_client: Arc<PollyClient>, voice: Option<String>) -> Self {
        Self {
            polly_client,
            voice,
            submitted: None,
            artifacts: HashMap::new(),
        }
    }

    /// Call AWS Polly to synthesize a single chunk as WAV
    async fn call_polly(&self, text: &str) -> Result<Vec<u8>, SessionError> {
        let voice_name = match &self.voice {
            Some(voice) => voice.clone(),
            None => detect_language(text).polly_voice().to_string(),
        };
        let engine = if is_voice_neural_compatible(&voice_name) {
            Engine::Neural
        } else {
            Engine::Standard
        };
        let voice_id = VoiceId::from(voice_name.as_str());

        tracing::info!(
            voice = %voice_name,
            engine = ?engine,
            output_format = "Pcm",
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Pcm)
            .sample_rate(PCM_SAMPLE_RATE.to_string())
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    voice = %voice_name,
                    engine = ?engine,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                match &e {
                    SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                        SessionError::Fatal(format!("AWS Polly unreachable: {e}"))
                    }
                    _ => SessionError::Rejected(format!("AWS Polly error: {e}")),
                }
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            SessionError::Rejected(format!("Failed to read audio stream: {e}"))
        })?;

        let pcm = audio_stream.into_bytes();
        tracing::debug!(pcm_size = pcm.len(), "Audio stream collected successfully");

        wrap_pcm16(&pcm, PCM_SAMPLE_RATE).map_err(|e| SessionError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl SynthesisSession for PollySession {
    async fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        self.submitted = Some(text.to_string());
        Ok(())
    }

    async fn await_artifact(&mut self, timeout: Duration) -> Result<ArtifactHandle, SessionError> {
        let text = self
            .submitted
            .take()
            .ok_or_else(|| SessionError::Rejected("nothing submitted".to_string()))?;

        let audio = tokio::time::timeout(timeout, self.call_polly(&text))
            .await
            .map_err(|_| SessionError::TimedOut(timeout))??;

        let id = Uuid::new_v4().to_string();
        self.artifacts.insert(id.clone(), audio);
        Ok(ArtifactHandle::new(id.clone(), id))
    }

    async fn fetch(&mut self, handle: &ArtifactHandle) -> Result<Vec<u8>, SessionError> {
        self.artifacts
            .remove(&handle.id)
            .ok_or_else(|| SessionError::Rejected(format!("unknown artifact {}", handle.id)))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.submitted = None;
        self.artifacts.clear();
        Ok(())
    }
}
