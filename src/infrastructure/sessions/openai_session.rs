use super::synthesis_session::{ArtifactHandle, SessionError, SessionFactory, SynthesisSession};
use crate::domain::tts::detect_language;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Creates OpenAI-backed sessions sharing one client
pub struct OpenAiSessionFactory {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
}

impl OpenAiSessionFactory {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, default_voice: String) -> Self {
        Self {
            client,
            model,
            default_voice,
        }
    }
}

#[async_trait]
impl SessionFactory for OpenAiSessionFactory {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn create(&self) -> Result<Box<dyn SynthesisSession>, SessionError> {
        Ok(Box::new(OpenAiSession {
            client: self.client.clone(),
            model: self.model.clone(),
            default_voice: self.default_voice.clone(),
            submitted: None,
            artifacts: HashMap::new(),
        }))
    }
}

/// OpenAI speech endpoint as a synthesis session, requesting WAV output
pub struct OpenAiSession {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
    submitted: Option<String>,
    artifacts: HashMap<String, Vec<u8>>,
}

impl OpenAiSession {
    fn voice_for(&self, text: &str) -> String {
        if self.default_voice.is_empty() {
            detect_language(text).openai_voice().to_string()
        } else {
            self.default_voice.clone()
        }
    }

    /// Call OpenAI TTS API to synthesize a single chunk
    async fn call_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>, SessionError> {
        tracing::info!(
            model = %self.model,
            voice = voice,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let model = match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        };

        let voice_enum = match voice.to_lowercase().as_str() {
            "alloy" => Voice::Alloy,
            "echo" => Voice::Echo,
            "fable" => Voice::Fable,
            "onyx" => Voice::Onyx,
            "nova" => Voice::Nova,
            "shimmer" => Voice::Shimmer,
            _ => Voice::Alloy,
        };

        let request = CreateSpeechRequest {
            model,
            input: text.to_string(),
            voice: voice_enum,
            response_format: Some(SpeechResponseFormat::Wav),
            speed: None,
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                voice = voice,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            match &e {
                OpenAIError::Reqwest(_) => SessionError::Fatal(format!("OpenAI unreachable: {e}")),
                _ => SessionError::Rejected(format!("OpenAI TTS error: {e}")),
            }
        })?;

        let audio_bytes = response.bytes.to_vec();
        tracing::debug!(
            audio_size = audio_bytes.len(),
            "OpenAI TTS audio received successfully"
        );

        Ok(audio_bytes)
    }
}

#[async_trait]
impl SynthesisSession for OpenAiSession {
    async fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        self.submitted = Some(text.to_string());
        Ok(())
    }

    async fn await_artifact(&mut self, timeout: Duration) -> Result<ArtifactHandle, SessionError> {
        let text = self
            .submitted
            .take()
            .ok_or_else(|| SessionError::Rejected("nothing submitted".to_string()))?;
        let voice = self.voice_for(&text);

        let audio = tokio::time::timeout(timeout, self.call_openai(&text, &voice))
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
