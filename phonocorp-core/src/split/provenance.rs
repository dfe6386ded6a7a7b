//! Split driven by tags encoded in utterance ids
//!
//! Some corpora ship with a fixed train/test assignment and a speaker
//! category baked into each utterance id, e.g. `book_ch01_s0042_L_tr`:
//! field 3 says whether the speaker is familiar (`L`) or novel (`N`), field 4
//! whether the utterance is for training (`tr`) or testing (`te`). The split
//! trusts those tags. Ids without them are skipped with a warning.
//!
//! The speakers of each category can be written out as plain lists,
//! `family/family.txt` and `new_speakers/new_speakers.txt` by default.

use super::CorpusSplit;
use crate::corpus::Corpus;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Where the tags sit in an utterance id and how they are spelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceLayout {
    pub separator: char,
    pub category_field: usize,
    pub assignment_field: usize,
    pub familiar_tag: String,
    pub novel_tag: String,
    pub train_tag: String,
    pub test_tag: String,
    /// Directory and file stem of the familiar speaker list
    pub familiar_list: String,
    /// Directory and file stem of the novel speaker list
    pub novel_list: String,
}

impl Default for ProvenanceLayout {
    fn default() -> Self {
        Self {
            separator: '_',
            category_field: 3,
            assignment_field: 4,
            familiar_tag: "L".to_string(),
            novel_tag: "N".to_string(),
            train_tag: "tr".to_string(),
            test_tag: "te".to_string(),
            familiar_list: "family".to_string(),
            novel_list: "new_speakers".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerCategory {
    Familiar,
    Novel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Train,
    Test,
}

/// Tags decoded from one utterance id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceTags {
    pub category: SpeakerCategory,
    pub assignment: Assignment,
}

/// Utterance id lacking the expected tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingWarning {
    pub utt_id: String,
    pub reason: String,
}

impl fmt::Display for EncodingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance '{}' skipped: {}", self.utt_id, self.reason)
    }
}

impl ProvenanceLayout {
    /// Decode the tags of `utt_id`
    pub fn parse(&self, utt_id: &str) -> std::result::Result<ProvenanceTags, EncodingWarning> {
        let fields: Vec<&str> = utt_id.split(self.separator).collect();
        let field = |index: usize, what: &str| {
            fields.get(index).copied().ok_or_else(|| EncodingWarning {
                utt_id: utt_id.to_string(),
                reason: format!("no {} field at position {}", what, index),
            })
        };

        let category = match field(self.category_field, "speaker category")? {
            tag if tag == self.familiar_tag => SpeakerCategory::Familiar,
            tag if tag == self.novel_tag => SpeakerCategory::Novel,
            tag => {
                return Err(EncodingWarning {
                    utt_id: utt_id.to_string(),
                    reason: format!("unknown speaker category tag '{}'", tag),
                })
            }
        };
        let assignment = match field(self.assignment_field, "train/test")? {
            tag if tag == self.train_tag => Assignment::Train,
            tag if tag == self.test_tag => Assignment::Test,
            tag => {
                return Err(EncodingWarning {
                    utt_id: utt_id.to_string(),
                    reason: format!("neither train nor test tag: '{}'", tag),
                })
            }
        };
        Ok(ProvenanceTags {
            category,
            assignment,
        })
    }
}

/// Result of a provenance-driven split
#[derive(Debug, Clone)]
pub struct ProvenanceSplit {
    pub train: Corpus,
    pub test: Corpus,
    /// Speakers tagged familiar, sorted and deduplicated
    pub familiar_speakers: Vec<String>,
    /// Speakers tagged novel, sorted and deduplicated
    pub novel_speakers: Vec<String>,
    /// Utterances left out of both subsets
    pub warnings: Vec<EncodingWarning>,
}

impl ProvenanceSplit {
    /// Write the speaker lists under `out_dir`, one speaker per line
    ///
    /// Each list goes to `<name>/<name>.txt`, with names taken from
    /// `layout.familiar_list` and `layout.novel_list`.
    pub fn write_speaker_lists(&self, out_dir: &Path, layout: &ProvenanceLayout) -> Result<()> {
        for (name, speakers) in [
            (layout.familiar_list.as_str(), &self.familiar_speakers),
            (layout.novel_list.as_str(), &self.novel_speakers),
        ] {
            let dir = out_dir.join(name);
            std::fs::create_dir_all(&dir)?;
            let mut content = String::new();
            for spk in speakers {
                content.push_str(spk);
                content.push('\n');
            }
            std::fs::write(dir.join(format!("{}.txt", name)), content)?;
        }
        Ok(())
    }
}

impl CorpusSplit<'_> {
    /// Split following the tags encoded in utterance ids
    pub fn split_by_provenance(&self, layout: &ProvenanceLayout) -> Result<ProvenanceSplit> {
        let mut train_ids = Vec::new();
        let mut test_ids = Vec::new();
        let mut familiar = BTreeSet::new();
        let mut novel = BTreeSet::new();
        let mut warnings = Vec::new();

        for (utt, spk) in &self.corpus.utt2spk {
            let tags = match layout.parse(utt) {
                Ok(tags) => tags,
                Err(warning) => {
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };
            match tags.assignment {
                Assignment::Train => train_ids.push(utt.clone()),
                Assignment::Test => test_ids.push(utt.clone()),
            }
            match tags.category {
                SpeakerCategory::Familiar => familiar.insert(spk.clone()),
                SpeakerCategory::Novel => novel.insert(spk.clone()),
            };
        }

        let (train, test) = self.materialize(super::SplitIds {
            train: train_ids,
            test: test_ids,
        })?;
        info!(
            "Provenance split: {} familiar and {} novel speakers, {} utterance(s) skipped",
            familiar.len(),
            novel.len(),
            warnings.len()
        );

        Ok(ProvenanceSplit {
            train,
            test,
            familiar_speakers: familiar.into_iter().collect(),
            novel_speakers: novel.into_iter().collect(),
            warnings,
        })
    }
}
