//! Canonical in-memory speech corpus
//!
//! A `Corpus` is six keyed tables plus two symbol sets. Preparators populate
//! the tables directly; everything else in this crate reads them through the
//! derived views below, or rebuilds them through `subset` and `prune`.
//!
//! Tables are `BTreeMap`s so every derived view, and therefore every seeded
//! split, iterates in the same order on every run.

mod prune;

pub use prune::PruneReport;

use crate::error::{CorpusError, Result};
use crate::probe::DurationProbe;
use crate::split::CorpusSplit;
use crate::validation::Validator;
use phonocorp_common::CorpusConfig;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Location of an utterance within a wav file
///
/// `start` and `end` are in seconds. Both unset means the whole wav is one
/// utterance; an unset `start` reads as 0 and an unset `end` as the end of
/// the wav.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub wav_id: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Segment {
    /// Segment covering a whole wav file
    pub fn whole(wav_id: impl Into<String>) -> Self {
        Self {
            wav_id: wav_id.into(),
            start: None,
            end: None,
        }
    }

    /// Segment covering `[start, end]` of a wav file
    pub fn timed(wav_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            wav_id: wav_id.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_whole_wav(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// One utterance of a wav, with times coerced to floats
///
/// An unset start becomes 0.0 and an unset end becomes `f64::INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UttSpan<'a> {
    pub utt_id: &'a str,
    pub start: f64,
    pub end: f64,
}

/// Speech corpus in canonical form
///
/// # Tables
/// * `wavs` - wav id to absolute audio path
/// * `segments` - utterance id to its location in a wav
/// * `text` - utterance id to whitespace-separated transcription
/// * `utt2spk` - utterance id to speaker id
/// * `lexicon` - word to space-joined phone sequence
/// * `phones` - phone symbol to display form (usually IPA)
/// * `silences` - non-speech phone symbols
/// * `variants` - reserved for pronunciation-variant phones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub wavs: BTreeMap<String, PathBuf>,
    pub segments: BTreeMap<String, Segment>,
    pub text: BTreeMap<String, String>,
    pub utt2spk: BTreeMap<String, String>,
    pub lexicon: BTreeMap<String, String>,
    pub phones: BTreeMap<String, String>,
    pub silences: BTreeSet<String>,
    pub variants: BTreeSet<String>,
}

impl Corpus {
    /// Create an empty corpus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one utterance in `segments`, `text` and `utt2spk` at once
    pub fn add_utterance(
        &mut self,
        utt_id: impl Into<String>,
        segment: Segment,
        text: impl Into<String>,
        speaker: impl Into<String>,
    ) {
        let utt_id = utt_id.into();
        self.segments.insert(utt_id.clone(), segment);
        self.text.insert(utt_id.clone(), text.into());
        self.utt2spk.insert(utt_id, speaker.into());
    }

    /// Utterance ids, taken from `utt2spk`
    pub fn utterances(&self) -> Vec<&str> {
        self.utt2spk.keys().map(String::as_str).collect()
    }

    /// Speaker ids, taken from `utt2spk` values
    pub fn speakers(&self) -> BTreeSet<&str> {
        self.utt2spk.values().map(String::as_str).collect()
    }

    /// Speakers mapped to their utterances, built in one pass over `utt2spk`
    pub fn speaker_to_utterances(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut spk2utt: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (utt, spk) in &self.utt2spk {
            spk2utt.entry(spk.as_str()).or_default().push(utt.as_str());
        }
        spk2utt
    }

    /// Wav ids mapped to the utterances they contain
    pub fn wav_to_utterances(&self) -> BTreeMap<&str, Vec<UttSpan<'_>>> {
        let mut wav2utt: BTreeMap<&str, Vec<UttSpan<'_>>> = BTreeMap::new();
        for (utt, segment) in &self.segments {
            wav2utt
                .entry(segment.wav_id.as_str())
                .or_default()
                .push(UttSpan {
                    utt_id: utt.as_str(),
                    start: segment.start.unwrap_or(0.0),
                    end: segment.end.unwrap_or(f64::INFINITY),
                });
        }
        wav2utt
    }

    /// Duration of every utterance, in seconds
    ///
    /// The probe is only consulted for utterances whose `end` is unset, once
    /// per wav.
    pub fn durations(&self, probe: &dyn DurationProbe) -> Result<BTreeMap<String, f64>> {
        let mut wav_durations: HashMap<&str, f64> = HashMap::new();
        let mut durations = BTreeMap::new();

        for (utt, segment) in &self.segments {
            let start = segment.start.unwrap_or(0.0);
            let end = match segment.end {
                Some(end) => end,
                None => match wav_durations.get(segment.wav_id.as_str()) {
                    Some(duration) => *duration,
                    None => {
                        let path = self.wavs.get(&segment.wav_id).ok_or_else(|| {
                            CorpusError::ReferentialIntegrity(format!(
                                "utterance '{}' references unknown wav '{}'",
                                utt, segment.wav_id
                            ))
                        })?;
                        let duration = probe.duration(path)?;
                        wav_durations.insert(segment.wav_id.as_str(), duration);
                        duration
                    }
                },
            };
            durations.insert(utt.clone(), end - start);
        }
        Ok(durations)
    }

    /// Words used in transcriptions
    ///
    /// With `restrict_to_lexicon`, only words that also have a lexicon entry.
    pub fn vocabulary(&self, restrict_to_lexicon: bool) -> BTreeSet<&str> {
        self.text
            .values()
            .flat_map(|utt| utt.split_whitespace())
            .filter(|word| !restrict_to_lexicon || self.lexicon.contains_key(*word))
            .collect()
    }

    /// True if at least one segment carries a start or end time
    pub fn has_multi_utterance_wavs(&self) -> bool {
        self.segments
            .values()
            .any(|s| s.start.is_some() || s.end.is_some())
    }

    /// Validate with default settings and `njobs` workers
    pub fn validate(&self, njobs: usize) -> Result<()> {
        Validator::default().with_njobs(njobs).validate(self)
    }

    /// Non-raising form of `validate`
    ///
    /// Only validation failures become `Ok(false)`; structural, I/O and
    /// probe errors still propagate.
    pub fn is_valid(&self, njobs: usize) -> Result<bool> {
        Validator::default().with_njobs(njobs).is_valid(self)
    }

    /// Sub-corpus made of the utterances in `utt_ids`
    ///
    /// The result is validated with `Validator::default()`: no OOV marker and
    /// no optional policies. Use `subset_with` to validate under a configured
    /// policy.
    pub fn subset<S: AsRef<str>>(&self, utt_ids: &[S], prune: bool) -> Result<Corpus> {
        self.subset_with(utt_ids, prune, &Validator::default())
    }

    /// Sub-corpus made of the utterances in `utt_ids`
    ///
    /// Every id must belong to `self`, else a `Configuration` error is
    /// returned before anything is built. Lexicon, phones, silences and
    /// variants are copied whole; wav paths are made absolute. The result is
    /// pruned on request and always validated before it is returned.
    ///
    /// # Arguments
    /// * `utt_ids` - Utterances to keep (duplicates are ignored)
    /// * `prune` - Drop wavs, words and phones the kept utterances do not use
    /// * `validator` - Validator applied to the result
    pub fn subset_with<S: AsRef<str>>(
        &self,
        utt_ids: &[S],
        prune: bool,
        validator: &Validator,
    ) -> Result<Corpus> {
        let missing: Vec<&str> = utt_ids
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|utt| {
                !(self.segments.contains_key(*utt)
                    && self.text.contains_key(*utt)
                    && self.utt2spk.contains_key(*utt))
            })
            .collect();
        if !missing.is_empty() {
            return Err(CorpusError::Configuration(format!(
                "{} requested utterance(s) not in corpus: {}",
                missing.len(),
                preview(missing.iter())
            )));
        }

        let mut corpus = Corpus {
            wavs: self
                .wavs
                .iter()
                .map(|(k, v)| (k.clone(), absolute_path(v)))
                .collect(),
            lexicon: self.lexicon.clone(),
            phones: self.phones.clone(),
            silences: self.silences.clone(),
            variants: self.variants.clone(),
            ..Corpus::default()
        };

        for utt in utt_ids.iter().map(AsRef::<str>::as_ref) {
            corpus.segments.insert(utt.to_string(), self.segments[utt].clone());
            corpus.text.insert(utt.to_string(), self.text[utt].clone());
            corpus.utt2spk.insert(utt.to_string(), self.utt2spk[utt].clone());
        }
        debug!(
            "Built sub-corpus of {} utterances from {}",
            corpus.utt2spk.len(),
            self.utt2spk.len()
        );

        if prune {
            corpus.prune();
        }
        validator.validate(&corpus)?;
        Ok(corpus)
    }

    /// Split into (train, test) sub-corpora following `config`
    ///
    /// Both sides are validated under `config.validation`, so a corpus that
    /// passes `Validator::try_new(config.validation)` always splits.
    pub fn split(&self, config: &CorpusConfig) -> Result<(Corpus, Corpus)> {
        let mut splitter = CorpusSplit::from_config(self, config)?;
        let split = &config.split;
        if split.by_speakers {
            splitter.split_by_speakers(split.train_prop, split.test_prop)
        } else {
            splitter.split(split.train_prop, split.test_prop)
        }
    }
}

/// Absolute form of `path`, resolving symlinks when the file exists
fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// First few items of a list, for error messages
pub(crate) fn preview<I, T>(items: I) -> String
where
    I: Iterator<Item = T>,
    T: std::fmt::Display,
{
    const MAX: usize = 10;
    let items: Vec<String> = items.map(|i| i.to_string()).collect();
    if items.len() > MAX {
        format!("{} ...", items[..MAX].join(", "))
    } else {
        items.join(", ")
    }
}
