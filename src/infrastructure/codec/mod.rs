pub mod wav_codec;

pub use wav_codec::{wrap_pcm16, WavCodec};

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cannot decode {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("{path:?} has format {found}, expected {expected}")]
    FormatMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("nothing to concatenate")]
    Empty,
    #[error("audio encoding failed: {0}")]
    Encode(String),
}

/// Decoder/encoder for the audio files chunks are stored as
pub trait AudioCodec: Send + Sync {
    /// File extension, without the dot
    fn extension(&self) -> &str;

    /// Fully decode `path`, failing if any part of it is unreadable
    fn decode_validate(&self, path: &Path) -> Result<(), CodecError>;

    /// Decode `paths` in order and encode their samples back to back into one file
    fn concat(&self, paths: &[PathBuf]) -> Result<Vec<u8>, CodecError>;
}
