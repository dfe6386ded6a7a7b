//! # phonocorp Common Library
//!
//! Shared code for the phonocorp crates including:
//! - Error types
//! - Configuration loading (validation and split settings)
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CorpusConfig, LoggingConfig, SplitConfig, ValidationConfig};
pub use error::{Error, Result};
