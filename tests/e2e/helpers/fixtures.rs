use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

const SAMPLES_PER_CHUNK: usize = 4;

fn spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// A short mono WAV whose samples all equal `value`
pub fn wav_bytes(value: i16) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec()).unwrap();
        for _ in 0..SAMPLES_PER_CHUNK {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[allow(dead_code)]
pub fn write_wav(path: &Path, value: i16) {
    std::fs::write(path, wav_bytes(value)).unwrap();
}

/// The value of each chunk in a merged file, in file order
#[allow(dead_code)]
pub fn chunk_values(path: &Path) -> Vec<i16> {
    let samples: Vec<i16> = WavReader::open(path)
        .unwrap()
        .into_samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    samples.chunks(SAMPLES_PER_CHUNK).map(|c| c[0]).collect()
}
