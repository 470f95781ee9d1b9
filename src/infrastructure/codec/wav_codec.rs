use super::{AudioCodec, CodecError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// WAV files through `hound`
#[derive(Debug, Default, Clone, Copy)]
pub struct WavCodec;

impl WavCodec {
    pub fn new() -> Self {
        Self
    }
}

impl AudioCodec for WavCodec {
    fn extension(&self) -> &str {
        "wav"
    }

    fn decode_validate(&self, path: &Path) -> Result<(), CodecError> {
        let reader = WavReader::open(path).map_err(|e| corrupt(path, e))?;
        let frames = reader.duration();
        let spec = reader.spec();

        let decoded = match spec.sample_format {
            SampleFormat::Float => drain::<f32, _>(reader, path)?,
            SampleFormat::Int => drain::<i32, _>(reader, path)?,
        };

        if decoded == 0 || frames == 0 {
            return Err(CodecError::Corrupt {
                path: path.to_path_buf(),
                reason: "no audio samples".to_string(),
            });
        }

        tracing::debug!(
            path = %path.display(),
            frames,
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "WAV decoded"
        );
        Ok(())
    }

    fn concat(&self, paths: &[PathBuf]) -> Result<Vec<u8>, CodecError> {
        let first = paths.first().ok_or(CodecError::Empty)?;
        let spec = WavReader::open(first)
            .map_err(|e| corrupt(first, e))?
            .spec();

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode)?;

            for path in paths {
                let reader = WavReader::open(path).map_err(|e| corrupt(path, e))?;
                let found = reader.spec();
                if found != spec {
                    return Err(CodecError::FormatMismatch {
                        path: path.clone(),
                        expected: describe(&spec),
                        found: describe(&found),
                    });
                }

                match spec.sample_format {
                    SampleFormat::Float => {
                        for sample in reader.into_samples::<f32>() {
                            let sample = sample.map_err(|e| corrupt(path, e))?;
                            writer.write_sample(sample).map_err(encode)?;
                        }
                    }
                    SampleFormat::Int => {
                        for sample in reader.into_samples::<i32>() {
                            let sample = sample.map_err(|e| corrupt(path, e))?;
                            writer.write_sample(sample).map_err(encode)?;
                        }
                    }
                }
            }

            writer.finalize().map_err(encode)?;
        }

        Ok(cursor.into_inner())
    }
}

/// Wrap raw little-endian 16-bit mono PCM in a WAV container
pub fn wrap_pcm16(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, CodecError> {
    if pcm.len() % 2 != 0 {
        return Err(CodecError::Encode(format!(
            "PCM stream has odd length {}",
            pcm.len()
        )));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode)?;
        for pair in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer.write_sample(sample).map_err(encode)?;
        }
        writer.finalize().map_err(encode)?;
    }

    Ok(cursor.into_inner())
}

fn drain<S, R>(reader: WavReader<R>, path: &Path) -> Result<usize, CodecError>
where
    S: hound::Sample,
    R: Read,
{
    let mut count = 0;
    for sample in reader.into_samples::<S>() {
        sample.map_err(|e| corrupt(path, e))?;
        count += 1;
    }
    Ok(count)
}

fn describe(spec: &WavSpec) -> String {
    let format = match spec.sample_format {
        SampleFormat::Float => "float",
        SampleFormat::Int => "int",
    };
    format!(
        "{} Hz/{} ch/{}-bit {}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, format
    )
}

fn corrupt(path: &Path, err: hound::Error) -> CodecError {
    CodecError::Corrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn encode(err: hound::Error) -> CodecError {
    CodecError::Encode(err.to_string())
}
