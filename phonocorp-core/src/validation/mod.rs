//! Corpus consistency validation
//!
//! Checks run cheapest first and stop at the first failing step:
//! 1. Structure: ids are non-empty single tokens, times are finite,
//!    pronunciations are non-empty
//! 2. Utterance universe: `segments`, `text` and `utt2spk` share one key set
//! 3. Wavs: references resolve, intervals are sane and disjoint (parallel)
//! 4. Words: every transcription token is in the lexicon or is the OOV marker
//! 5. Phones: every pronunciation phone is in phones ∪ silences
//!
//! Validation never mutates the corpus.

mod intervals;

use crate::corpus::{preview, Corpus};
use crate::error::{CorpusError, Result};
use crate::probe::{AudioFileProbe, DurationProbe};
use phonocorp_common::ValidationConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Corpus consistency validator
#[derive(Clone)]
pub struct Validator {
    config: ValidationConfig,
    probe: Option<Arc<dyn DurationProbe>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

impl Validator {
    /// Create a validator from configuration
    ///
    /// Audio is probed with symphonia when `probe_audio` is set.
    pub fn new(config: ValidationConfig) -> Self {
        let probe: Option<Arc<dyn DurationProbe>> = if config.probe_audio {
            Some(Arc::new(AudioFileProbe))
        } else {
            None
        };
        Self { config, probe }
    }

    /// Like `new`, but rejects settings the checks cannot run with
    pub fn try_new(config: ValidationConfig) -> Result<Self> {
        config.check()?;
        Ok(Self::new(config))
    }

    /// Use `probe` to bound segment intervals by wav durations
    pub fn with_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Worker count for the wav checks (at least 1)
    pub fn with_njobs(mut self, njobs: usize) -> Self {
        self.config.njobs = njobs.max(1);
        self
    }

    /// Accept `marker` in transcriptions without a lexicon entry
    pub fn with_oov_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.oov_marker = Some(marker.into());
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `corpus`, failing on the first violated check
    pub fn validate(&self, corpus: &Corpus) -> Result<()> {
        check_structure(corpus)?;
        self.check_utterance_universe(corpus)?;
        self.check_wavs(corpus)?;
        self.check_words(corpus)?;
        self.check_phones(corpus)?;

        debug!(
            "Corpus validated: {} utterances, {} speakers, {} wavs, {} words",
            corpus.utt2spk.len(),
            corpus.speakers().len(),
            corpus.wavs.len(),
            corpus.lexicon.len()
        );
        Ok(())
    }

    /// `Ok(false)` on a validation failure, `Err` when validation could not run
    pub fn is_valid(&self, corpus: &Corpus) -> Result<bool> {
        match self.validate(corpus) {
            Ok(()) => Ok(true),
            Err(e) if e.is_validation_failure() => {
                debug!("Corpus is not valid: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn check_utterance_universe(&self, corpus: &Corpus) -> Result<()> {
        let tables = [
            ("segments", corpus.segments.keys().collect::<BTreeSet<_>>()),
            ("text", corpus.text.keys().collect()),
            ("utt2spk", corpus.utt2spk.keys().collect()),
        ];

        for (name, keys) in &tables {
            for (other_name, other_keys) in &tables {
                if let Some(utt) = keys.difference(other_keys).next() {
                    return Err(CorpusError::ReferentialIntegrity(format!(
                        "utterance '{}' is in {} but not in {}",
                        utt, name, other_name
                    )));
                }
            }
        }

        if self.config.require_speaker_prefix {
            if let Some((utt, spk)) = corpus
                .utt2spk
                .iter()
                .find(|(utt, spk)| !utt.starts_with(spk.as_str()))
            {
                return Err(CorpusError::ReferentialIntegrity(format!(
                    "utterance '{}' is not prefixed by its speaker id '{}'",
                    utt, spk
                )));
            }
        }
        Ok(())
    }

    fn check_wavs(&self, corpus: &Corpus) -> Result<()> {
        if let Some((utt, segment)) = corpus
            .segments
            .iter()
            .find(|(_, s)| !corpus.wavs.contains_key(&s.wav_id))
        {
            return Err(CorpusError::ReferentialIntegrity(format!(
                "utterance '{}' references wav '{}' which is not registered",
                utt, segment.wav_id
            )));
        }

        if self.config.check_wav_files {
            if let Some((wav, path)) = corpus.wavs.iter().find(|(_, path)| !path.exists()) {
                return Err(CorpusError::ReferentialIntegrity(format!(
                    "wav '{}' not found at {}",
                    wav,
                    path.display()
                )));
            }
        }

        let wav2utt = corpus.wav_to_utterances();
        let orphans = corpus
            .wavs
            .keys()
            .filter(|wav| !wav2utt.contains_key(wav.as_str()))
            .count();
        if orphans > 0 {
            warn!("{} wav file(s) are not referenced by any segment", orphans);
        }

        intervals::check_all(corpus, &wav2utt, &self.config, self.probe.as_deref())
    }

    fn check_words(&self, corpus: &Corpus) -> Result<()> {
        let oov_marker = self.config.oov_marker.as_deref();
        let unknown: BTreeSet<&str> = corpus
            .vocabulary(false)
            .into_iter()
            .filter(|word| !corpus.lexicon.contains_key(*word) && Some(*word) != oov_marker)
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }
        Err(CorpusError::Coverage(format!(
            "{} word(s) in text are not in the lexicon: {}",
            unknown.len(),
            preview(unknown.iter())
        )))
    }

    fn check_phones(&self, corpus: &Corpus) -> Result<()> {
        if self.config.require_disjoint_silences {
            let shared: Vec<&String> = corpus
                .silences
                .iter()
                .filter(|s| corpus.phones.contains_key(*s))
                .collect();
            if !shared.is_empty() {
                return Err(CorpusError::Coverage(format!(
                    "silence symbol(s) also listed as phones: {}",
                    preview(shared.iter())
                )));
            }
        }

        let unknown: BTreeSet<&str> = corpus
            .lexicon
            .values()
            .flat_map(|pron| pron.split_whitespace())
            .filter(|phone| !corpus.phones.contains_key(*phone) && !corpus.silences.contains(*phone))
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }
        Err(CorpusError::Coverage(format!(
            "{} phone(s) in lexicon are neither phones nor silences: {}",
            unknown.len(),
            preview(unknown.iter())
        )))
    }
}

fn check_structure(corpus: &Corpus) -> Result<()> {
    for (wav, path) in &corpus.wavs {
        check_token("wav id", "wavs", wav)?;
        if path.as_os_str().is_empty() {
            return Err(CorpusError::Structural(format!("wav '{}' has an empty path", wav)));
        }
    }

    for (utt, segment) in &corpus.segments {
        check_token("utterance id", "segments", utt)?;
        check_token("wav id", "segments", &segment.wav_id)?;
        for time in [segment.start, segment.end].into_iter().flatten() {
            if !time.is_finite() {
                return Err(CorpusError::Structural(format!(
                    "segment '{}' has a non-finite time {}",
                    utt, time
                )));
            }
        }
    }

    for utt in corpus.text.keys() {
        check_token("utterance id", "text", utt)?;
    }

    for (utt, spk) in &corpus.utt2spk {
        check_token("utterance id", "utt2spk", utt)?;
        check_token("speaker id", "utt2spk", spk)?;
    }

    for (word, pron) in &corpus.lexicon {
        check_token("word", "lexicon", word)?;
        if pron.split_whitespace().next().is_none() {
            return Err(CorpusError::Structural(format!(
                "lexicon word '{}' has an empty pronunciation",
                word
            )));
        }
    }

    for phone in corpus
        .phones
        .keys()
        .chain(corpus.silences.iter())
        .chain(corpus.variants.iter())
    {
        check_token("phone", "phones", phone)?;
    }
    Ok(())
}

/// Table keys are single non-empty whitespace-free tokens
fn check_token(kind: &str, table: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CorpusError::Structural(format!("empty {} in {}", kind, table)));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CorpusError::Structural(format!(
            "{} '{}' in {} contains whitespace",
            kind, value, table
        )));
    }
    Ok(())
}
