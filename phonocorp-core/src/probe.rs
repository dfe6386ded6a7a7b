//! Audio duration probing
//!
//! Durations are only needed for whole-wav utterances and for bounding
//! segment intervals. The symphonia-backed probe reads container headers;
//! it does not decode samples.

use crate::error::{CorpusError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Header-level facts about an audio file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    /// Duration in seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: Option<u16>,
}

/// Source of audio durations
///
/// Implementations must be shareable across the validator's worker threads.
pub trait DurationProbe: Send + Sync {
    /// Read header information for the audio file at `path`
    fn probe(&self, path: &Path) -> Result<AudioInfo>;

    /// Duration of the audio file at `path`, in seconds
    fn duration(&self, path: &Path) -> Result<f64> {
        Ok(self.probe(path)?.duration)
    }
}

/// Probe reading audio headers with symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioFileProbe;

impl DurationProbe for AudioFileProbe {
    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| CorpusError::AudioProbe(path.to_path_buf(), e.to_string()))?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                CorpusError::AudioProbe(path.to_path_buf(), "no audio track".to_string())
            })?;

        let params = &track.codec_params;
        let sample_rate = params.sample_rate.ok_or_else(|| {
            CorpusError::AudioProbe(path.to_path_buf(), "sample rate unknown".to_string())
        })?;
        let n_frames = params.n_frames.ok_or_else(|| {
            CorpusError::AudioProbe(path.to_path_buf(), "frame count unknown".to_string())
        })?;

        let info = AudioInfo {
            duration: n_frames as f64 / sample_rate as f64,
            sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
        };
        debug!(
            "Probed {}: {:.3}s @ {} Hz",
            path.display(),
            info.duration,
            info.sample_rate
        );
        Ok(info)
    }
}

/// Probe answering from a precomputed table
///
/// For preparators that already know their durations, and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticProbe {
    entries: HashMap<PathBuf, AudioInfo>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with the given duration and sample rate
    pub fn with(mut self, path: impl Into<PathBuf>, duration: f64, sample_rate: u32) -> Self {
        self.entries.insert(
            path.into(),
            AudioInfo {
                duration,
                sample_rate,
                channels: Some(1),
            },
        );
        self
    }
}

impl DurationProbe for StaticProbe {
    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        self.entries.get(path).copied().ok_or_else(|| {
            CorpusError::AudioProbe(path.to_path_buf(), "no registered duration".to_string())
        })
    }
}
