//! Audio Test Fixture Generator
//!
//! Writes short tone WAV files so the symphonia probe has real headers to read

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Generate a test WAV file with specified configuration
///
/// # Arguments
/// * `path` - Output file path
/// * `config` - Audio configuration
///
/// # Returns
/// Generated file path
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> Result<PathBuf, hound::Error> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_frames {
        // 440Hz tone at 30% amplitude
        let t = i as f32 / config.sample_rate as f32;
        let sample =
            (0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate one WAV per wav id in `dir`, returning (wav id, path) pairs
pub fn generate_corpus_wavs(
    dir: &Path,
    wav_ids: &[&str],
    config: &AudioConfig,
) -> Result<Vec<(String, PathBuf)>, hound::Error> {
    let mut files = Vec::new();
    for wav_id in wav_ids {
        let path = generate_test_wav(&dir.join(format!("{}.wav", wav_id)), config)?;
        files.push((wav_id.to_string(), path));
    }
    Ok(files)
}
