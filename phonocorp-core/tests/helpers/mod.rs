//! Test Helper Utilities
//!
//! Shared utilities for testing phonocorp-core

#![allow(dead_code, unused_imports)]

pub mod audio_generator;
pub mod corpus_builder;

// Re-export commonly used items
pub use audio_generator::{generate_corpus_wavs, generate_test_wav, AudioConfig};
pub use corpus_builder::{scenario_corpus, synthetic_corpus};
