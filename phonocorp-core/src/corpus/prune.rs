//! In-place removal of entries unreachable from the utterance set

use super::Corpus;
use std::collections::BTreeSet;
use tracing::debug;

/// Number of entries removed from each table by a prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub utterance_entries: usize,
    pub wavs: usize,
    pub words: usize,
    pub phones: usize,
}

impl PruneReport {
    /// True if the pass removed nothing
    pub fn is_noop(&self) -> bool {
        *self == PruneReport::default()
    }
}

impl Corpus {
    /// Remove entries not reachable from the utterances in `utt2spk`
    ///
    /// Runs utterances → wavs → lexicon → phones, each step reading the
    /// tables as left by the previous one. Only removes entries. Silences
    /// and variants are left untouched.
    pub fn prune(&mut self) -> PruneReport {
        let mut report = PruneReport::default();

        let utts: BTreeSet<String> = self.utt2spk.keys().cloned().collect();
        let before = self.segments.len() + self.text.len();
        self.segments.retain(|utt, _| utts.contains(utt));
        self.text.retain(|utt, _| utts.contains(utt));
        report.utterance_entries = before - self.segments.len() - self.text.len();

        let wavs: BTreeSet<String> = self
            .segments
            .values()
            .map(|s| s.wav_id.clone())
            .collect();
        let before = self.wavs.len();
        self.wavs.retain(|wav, _| wavs.contains(wav));
        report.wavs = before - self.wavs.len();

        let words: BTreeSet<String> = self
            .vocabulary(false)
            .into_iter()
            .map(str::to_string)
            .collect();
        let before = self.lexicon.len();
        self.lexicon.retain(|word, _| words.contains(word));
        report.words = before - self.lexicon.len();

        let phones: BTreeSet<String> = self
            .lexicon
            .values()
            .flat_map(|pron| pron.split_whitespace())
            .map(str::to_string)
            .collect();
        let before = self.phones.len();
        self.phones.retain(|phone, _| phones.contains(phone));
        report.phones = before - self.phones.len();

        debug!(
            "Pruned {} utterance entries, {} wavs, {} words, {} phones",
            report.utterance_entries, report.wavs, report.words, report.phones
        );
        report
    }
}
