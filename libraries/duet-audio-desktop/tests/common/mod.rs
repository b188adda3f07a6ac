//! Shared fixtures for desktop host tests
#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

/// 16-bit stereo WAV alternating between `level` and `-level` each frame
pub fn wav_bytes(sample_rate: u32, frames: usize, level: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for frame in 0..frames {
            let sample = if frame % 2 == 0 { level } else { -level };
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write `bytes` to `name` inside a fresh temp dir
pub fn temp_file(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}
