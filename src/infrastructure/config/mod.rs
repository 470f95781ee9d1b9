use crate::domain::ledger::{LedgerError, NameTemplate};
use crate::domain::synthesis::ProcessorSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "audio_chunk_{index:04d}.wav";
pub const DEFAULT_FINAL_FILENAME: &str = "output_final.wav";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
    #[error("invalid run setting: {0}")]
    Setting(String),
    #[error(transparent)]
    Template(#[from] LedgerError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_format: LogFormat,
    pub provider: SessionProvider,
    pub aws_region: String,
    /// Fixed Polly voice; chosen by language when unset
    pub polly_voice: Option<String>,
    pub openai_model: String,
    /// Fixed OpenAI voice; chosen by language when empty
    pub openai_voice: String,
    pub folder_request_path: PathBuf,
    pub folder_download_dir: PathBuf,
    pub run: RunSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Which synthesizer backs the session
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionProvider {
    Polly,
    OpenAi,
    Folder,
}

impl FromStr for SessionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polly" => Ok(SessionProvider::Polly),
            "openai" => Ok(SessionProvider::OpenAi),
            "folder" => Ok(SessionProvider::Folder),
            other => Err(format!("unknown provider {other:?}, expected polly, openai or folder")),
        }
    }
}

/// Parameters of one synthesis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Maximum chunk length in characters
    pub max_length: usize,
    pub filename_template: String,
    pub final_filename: String,
    /// Pause after each completed chunk while more remain
    pub inter_chunk_delay: Duration,
    /// Total attempts per chunk
    pub max_attempts: u32,
    pub max_restarts: u32,
    pub artifact_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_length: 999,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            final_filename: DEFAULT_FINAL_FILENAME.to_string(),
            inter_chunk_delay: Duration::from_secs(10),
            max_attempts: 2,
            max_restarts: 3,
            artifact_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl RunSettings {
    /// Check the settings and parse the filename template
    pub fn validate(&self) -> Result<NameTemplate, ConfigError> {
        if self.max_length == 0 {
            return Err(ConfigError::Setting("max chunk length must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Setting(
                "at least one attempt per chunk is required".to_string(),
            ));
        }
        if self.artifact_timeout.is_zero() {
            return Err(ConfigError::Setting("artifact timeout must be positive".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Setting("artifact poll interval must be positive".to_string()));
        }
        let final_name = self.final_filename.trim();
        if final_name.is_empty() || final_name.contains('/') || final_name.contains('\\') {
            return Err(ConfigError::Setting(format!(
                "final filename {:?} must be a bare file name",
                self.final_filename
            )));
        }

        Ok(NameTemplate::parse(&self.filename_template)?)
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            artifact_timeout: self.artifact_timeout,
            max_attempts: self.max_attempts,
            poll_interval: self.poll_interval,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = RunSettings::default();
        let config = Config {
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })
                .unwrap_or(LogFormat::Pretty),
            provider: var_or("TTS_PROVIDER", "polly")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            polly_voice: env::var("POLLY_VOICE").ok().filter(|v| !v.trim().is_empty()),
            openai_model: env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            openai_voice: env::var("OPENAI_TTS_VOICE").unwrap_or_default(),
            folder_request_path: env::var("FOLDER_REQUEST_PATH")
                .unwrap_or_else(|_| "tts_request.txt".to_string())
                .into(),
            folder_download_dir: env::var("FOLDER_DOWNLOAD_DIR")
                .unwrap_or_else(|_| "downloads".to_string())
                .into(),
            run: RunSettings {
                max_length: var_or("CHUNK_MAX_LENGTH", "999")?,
                filename_template: env::var("CHUNK_FILENAME_TEMPLATE")
                    .unwrap_or(defaults.filename_template),
                final_filename: env::var("FINAL_FILENAME").unwrap_or(defaults.final_filename),
                inter_chunk_delay: Duration::from_secs(var_or("INTER_CHUNK_DELAY_SECS", "10")?),
                max_attempts: var_or("CHUNK_MAX_ATTEMPTS", "2")?,
                max_restarts: var_or("MAX_SESSION_RESTARTS", "3")?,
                artifact_timeout: Duration::from_secs(var_or("ARTIFACT_TIMEOUT_SECS", "120")?),
                poll_interval: Duration::from_millis(var_or("ARTIFACT_POLL_INTERVAL_MS", "1000")?),
            },
        };

        Ok(config)
    }
}

fn var_or<T>(var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var: var.to_string(),
        value: value.clone(),
        reason: e.to_string(),
    })
}
