//! # phonocorp-core
//!
//! Canonical speech corpus model shared by corpus preparators and the
//! downstream modeling recipes:
//! - `Corpus`: six keyed tables (wavs, segments, text, utt2spk, lexicon,
//!   phones) plus silence and variant symbol sets, with derived views
//! - `Corpus::prune`: drop entries unreachable from the utterance set
//! - `Validator`: referential integrity and coverage checks
//! - `CorpusSplit`: seeded train/test partitioning by utterance, by speaker,
//!   or by provenance tags encoded in utterance ids
//!
//! Reading and writing corpora on disk is left to callers.

pub mod corpus;
pub mod error;
pub mod probe;
pub mod split;
pub mod validation;

pub use corpus::{Corpus, PruneReport, Segment, UttSpan};
pub use error::{CorpusError, Result};
pub use probe::{AudioFileProbe, AudioInfo, DurationProbe, StaticProbe};
pub use split::{CorpusSplit, Proportions, ProvenanceLayout, ProvenanceSplit, SplitIds};
pub use validation::Validator;
