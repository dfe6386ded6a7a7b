//! Error types for phonocorp-core
//!
//! Validation failures (referential integrity, coverage) are the only
//! variants `Corpus::is_valid` turns into `false`. Everything else
//! propagates.

use std::path::PathBuf;
use thiserror::Error;

/// Corpus error type
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Malformed table entry (empty id, non-finite time, empty pronunciation)
    #[error("Structural error: {0}")]
    Structural(String),

    /// Utterance tables disagree, a wav reference dangles, or segment intervals are insane
    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(String),

    /// A word is missing from the lexicon or a phone from the inventory
    #[error("Coverage error: {0}")]
    Coverage(String),

    /// Invalid split proportions or unknown utterance requested
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Audio file could not be probed
    #[error("Audio probe error {0}: {1}")]
    AudioProbe(PathBuf, String),

    /// Worker pool for parallel checks could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// phonocorp-common error
    #[error("Common error: {0}")]
    Common(#[from] phonocorp_common::Error),
}

impl CorpusError {
    /// True for failures that mean "this corpus is not valid" as opposed to
    /// "validation could not run"
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            CorpusError::ReferentialIntegrity(_) | CorpusError::Coverage(_)
        )
    }
}

/// Result type for corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(CorpusError::ReferentialIntegrity("x".into()).is_validation_failure());
        assert!(CorpusError::Coverage("x".into()).is_validation_failure());
        assert!(!CorpusError::Structural("x".into()).is_validation_failure());
        assert!(!CorpusError::Configuration("x".into()).is_validation_failure());
        assert!(!CorpusError::Io(std::io::Error::other("disk")).is_validation_failure());
    }

    #[test]
    fn test_display_includes_category() {
        let err = CorpusError::Coverage("word 'zzz' not in lexicon".into());
        assert_eq!(err.to_string(), "Coverage error: word 'zzz' not in lexicon");
    }
}
