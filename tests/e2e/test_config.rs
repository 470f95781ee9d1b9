use longform_tts::infrastructure::config::{Config, ConfigError, LogFormat, SessionProvider};
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: &[&str] = &[
    "LOG_FORMAT",
    "TTS_PROVIDER",
    "POLLY_VOICE",
    "OPENAI_TTS_VOICE",
    "CHUNK_MAX_LENGTH",
    "CHUNK_FILENAME_TEMPLATE",
    "FINAL_FILENAME",
    "INTER_CHUNK_DELAY_SECS",
    "CHUNK_MAX_ATTEMPTS",
    "MAX_SESSION_RESTARTS",
    "ARTIFACT_TIMEOUT_SECS",
    "ARTIFACT_POLL_INTERVAL_MS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn it_should_fall_back_to_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.log_format, LogFormat::Pretty);
    assert_eq!(config.provider, SessionProvider::Polly);
    assert_eq!(config.polly_voice, None);
    assert_eq!(config.run.max_length, 999);
    assert_eq!(config.run.filename_template, "audio_chunk_{index:04d}.wav");
    assert_eq!(config.run.final_filename, "output_final.wav");
    assert_eq!(config.run.inter_chunk_delay, Duration::from_secs(10));
    assert_eq!(config.run.max_attempts, 2);
    assert_eq!(config.run.max_restarts, 3);
    assert_eq!(config.run.artifact_timeout, Duration::from_secs(120));
    assert!(config.run.validate().is_ok());
}

#[test]
#[serial]
fn it_should_read_run_settings_from_the_environment() {
    clear_env();
    env::set_var("LOG_FORMAT", "json");
    env::set_var("TTS_PROVIDER", "folder");
    env::set_var("CHUNK_MAX_LENGTH", "400");
    env::set_var("CHUNK_FILENAME_TEMPLATE", "part_{index:03}");
    env::set_var("INTER_CHUNK_DELAY_SECS", "0");
    env::set_var("MAX_SESSION_RESTARTS", "5");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.provider, SessionProvider::Folder);
    assert_eq!(config.run.max_length, 400);
    assert_eq!(config.run.inter_chunk_delay, Duration::ZERO);
    assert_eq!(config.run.max_restarts, 5);

    let template = config.run.validate().unwrap();
    assert_eq!(template.file_name(12, "wav"), "part_012.wav");
}

#[test]
#[serial]
fn it_should_reject_malformed_numbers() {
    clear_env();
    env::set_var("CHUNK_MAX_ATTEMPTS", "twice");

    let result = Config::from_env();
    clear_env();

    match result {
        Err(ConfigError::Invalid { var, value, .. }) => {
            assert_eq!(var, "CHUNK_MAX_ATTEMPTS");
            assert_eq!(value, "twice");
        }
        other => panic!("expected invalid value error, got {other:?}"),
    }
}

#[test]
#[serial]
fn it_should_reject_unknown_providers() {
    clear_env();
    env::set_var("TTS_PROVIDER", "browser");

    let result = Config::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}
