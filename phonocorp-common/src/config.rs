//! Configuration loading for corpus validation and splitting
//!
//! Config file resolution priority order:
//! 1. Explicit path argument (highest priority)
//! 2. `PHONOCORP_CONFIG` environment variable
//! 3. User config file (`<config_dir>/phonocorp/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing user config file is not an error. A file named explicitly (by
//! argument or environment) must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "PHONOCORP_CONFIG";

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub validation: ValidationConfig,
    pub split: SplitConfig,
    pub logging: LoggingConfig,
}

/// Settings consumed by the consistency validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Worker count for the wav interval checks
    pub njobs: usize,
    /// Out-of-vocabulary marker allowed in transcriptions without a lexicon entry
    pub oov_marker: Option<String>,
    /// Reject corpora whose silence symbols also appear in the phone inventory
    pub require_disjoint_silences: bool,
    /// Require every utterance id to start with its speaker id
    pub require_speaker_prefix: bool,
    /// Probe wav durations to bound segment intervals
    ///
    /// A referenced wav that cannot be opened is then an I/O error, not a
    /// validation failure, unless `check_wav_files` is also set.
    pub probe_audio: bool,
    /// Require every path in the wavs table to exist on disk, including
    /// wavs no segment references
    pub check_wav_files: bool,
    /// Sample rate expected for every wav (mismatches are logged, not rejected)
    pub expected_sample_rate: Option<u32>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            njobs: default_njobs(),
            oov_marker: None,
            require_disjoint_silences: false,
            require_speaker_prefix: false,
            probe_audio: false,
            check_wav_files: false,
            expected_sample_rate: None,
        }
    }
}

/// Train/test partitioning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_prop: Option<f64>,
    pub test_prop: Option<f64>,
    /// Keep per-speaker utterance proportions in both subsets
    pub by_speakers: bool,
    /// Prune the produced subsets
    pub prune: bool,
    /// Seed for reproducible splits (system entropy when unset)
    pub random_seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_prop: None,
            test_prop: None,
            by_speakers: true,
            prune: true,
            random_seed: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Number of worker threads used when none is configured
pub fn default_njobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl CorpusConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CorpusConfig = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load the configuration following the priority order
    ///
    /// # Arguments
    /// * `cli_arg` - Explicit config path supplied by the caller
    ///
    /// # Returns
    /// * `Ok(CorpusConfig)` - Loaded config, or compiled defaults when no file applies
    /// * `Err` - An explicitly named file is missing or malformed
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit argument
        if let Some(path) = cli_arg {
            info!("Loading config from {}", path.display());
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::from_file(&path);
        }

        // Priority 3: user config file
        if let Some(path) = user_config_path() {
            if path.exists() {
                info!("Loading config from {}", path.display());
                return Self::from_file(&path);
            }
            debug!("No config file at {}, using defaults", path.display());
        }

        // Priority 4: compiled defaults
        Ok(Self::default())
    }

    /// Reject values no component can work with
    pub fn check(&self) -> Result<()> {
        self.validation.check()?;
        self.split.check()
    }
}

impl ValidationConfig {
    /// Reject settings the validator cannot run with
    pub fn check(&self) -> Result<()> {
        if self.njobs == 0 {
            return Err(Error::InvalidInput(
                "validation.njobs must be at least 1".to_string(),
            ));
        }
        if let Some(marker) = &self.oov_marker {
            if marker.split_whitespace().count() != 1 {
                return Err(Error::InvalidInput(format!(
                    "validation.oov_marker must be a single word, got {:?}",
                    marker
                )));
            }
        }
        Ok(())
    }
}

impl SplitConfig {
    /// Reject proportions outside (0, 1) at load time
    pub fn check(&self) -> Result<()> {
        for (name, value) in [("train_prop", self.train_prop), ("test_prop", self.test_prop)] {
            if let Some(v) = value {
                if !(v > 0.0 && v < 1.0) {
                    return Err(Error::InvalidInput(format!(
                        "split.{} must be in (0, 1), got {}",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Platform path of the user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("phonocorp").join("config.toml"))
}
