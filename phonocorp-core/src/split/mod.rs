//! Train/test partitioning of a corpus
//!
//! Both strategies compute two disjoint utterance id lists, then build each
//! side with `Corpus::subset_with`, so both outputs are independently
//! validated. The random generator is seeded per splitter; the same seed on
//! the same corpus always yields the same partition.

mod provenance;

pub use provenance::{
    Assignment, EncodingWarning, ProvenanceLayout, ProvenanceSplit, ProvenanceTags,
    SpeakerCategory,
};

use crate::corpus::Corpus;
use crate::error::{CorpusError, Result};
use crate::validation::Validator;
use phonocorp_common::CorpusConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info};

/// Resolved train/test proportions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proportions {
    pub train: f64,
    pub test: f64,
}

impl Proportions {
    /// Resolve optional proportions
    ///
    /// Neither given: test is 0.5. One given: the other is its complement.
    /// Each must lie in (0, 1) and their sum must not exceed 1.
    pub fn resolve(train: Option<f64>, test: Option<f64>) -> Result<Self> {
        for (name, value) in [("train", train), ("test", test)] {
            if let Some(v) = value {
                if !(v > 0.0 && v < 1.0) {
                    return Err(CorpusError::Configuration(format!(
                        "{} proportion must be in (0, 1), got {}",
                        name, v
                    )));
                }
            }
        }

        let (train, test) = match (train, test) {
            (None, None) => (0.5, 0.5),
            (Some(train), None) => (train, 1.0 - train),
            (None, Some(test)) => (1.0 - test, test),
            (Some(train), Some(test)) => (train, test),
        };
        if train + test > 1.0 + f64::EPSILON {
            return Err(CorpusError::Configuration(format!(
                "train and test proportions sum to {} (> 1)",
                train + test
            )));
        }
        Ok(Self { train, test })
    }

    /// True when every utterance goes to one side or the other
    pub fn is_complementary(&self) -> bool {
        (self.train + self.test - 1.0).abs() <= 1e-9
    }
}

/// Utterance ids of a computed partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIds {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

/// Corpus splitter
///
/// `corpus` is assumed valid. Train and test sub-corpora are pruned when
/// `prune` is set and validated with the splitter's validator.
pub struct CorpusSplit<'a> {
    corpus: &'a Corpus,
    rng: StdRng,
    prune: bool,
    validator: Validator,
}

impl<'a> CorpusSplit<'a> {
    /// Create a splitter; without a seed the generator uses system entropy
    pub fn new(corpus: &'a Corpus, random_seed: Option<u64>, prune: bool) -> Self {
        let rng = match random_seed {
            Some(seed) => {
                debug!("random seed is {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        debug!(
            "loaded {} utterances from {} speakers",
            corpus.utt2spk.len(),
            corpus.speakers().len()
        );
        Self {
            corpus,
            rng,
            prune,
            validator: Validator::default(),
        }
    }

    /// Create a splitter from the split settings of `config`
    ///
    /// Produced sub-corpora are validated under `config.validation`.
    pub fn from_config(corpus: &'a Corpus, config: &CorpusConfig) -> Result<Self> {
        let validator = Validator::try_new(config.validation.clone())?;
        Ok(Self::new(corpus, config.split.random_seed, config.split.prune).with_validator(validator))
    }

    /// Validate the produced sub-corpora with `validator`
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Split by utterances regardless of speakers
    ///
    /// Returns a (train, test) pair of corpora.
    pub fn split(&mut self, train_prop: Option<f64>, test_prop: Option<f64>) -> Result<(Corpus, Corpus)> {
        let ids = self.split_ids(train_prop, test_prop)?;
        self.materialize(ids)
    }

    /// Split keeping each speaker's utterances in both subsets in proportion
    ///
    /// Returns a (train, test) pair of corpora.
    pub fn split_by_speakers(
        &mut self,
        train_prop: Option<f64>,
        test_prop: Option<f64>,
    ) -> Result<(Corpus, Corpus)> {
        let ids = self.split_by_speakers_ids(train_prop, test_prop)?;
        self.materialize(ids)
    }

    /// Utterance partition computed by `split`
    pub fn split_ids(&mut self, train_prop: Option<f64>, test_prop: Option<f64>) -> Result<SplitIds> {
        let props = Proportions::resolve(train_prop, test_prop)?;

        let mut utts = self.corpus.utterances();
        utts.shuffle(&mut self.rng);

        let (n_train, n_test) = side_sizes(utts.len(), &props);
        let ids = SplitIds {
            train: utts[..n_train].iter().map(|u| u.to_string()).collect(),
            test: utts[n_train..n_train + n_test]
                .iter()
                .map(|u| u.to_string())
                .collect(),
        };
        debug!(
            "split by utterances: {} train, {} test",
            ids.train.len(),
            ids.test.len()
        );
        Ok(ids)
    }

    /// Utterance partition computed by `split_by_speakers`
    ///
    /// Each speaker's train share is apportioned by largest remainder, so a
    /// speaker with `n` utterances sends `floor(n * train)` or one more to
    /// train and the corpus-wide train size is `round(N * train)`.
    pub fn split_by_speakers_ids(
        &mut self,
        train_prop: Option<f64>,
        test_prop: Option<f64>,
    ) -> Result<SplitIds> {
        let props = Proportions::resolve(train_prop, test_prop)?;

        let mut spk2utt: Vec<Vec<&str>> = self.corpus.speaker_to_utterances().into_values().collect();
        for utts in &mut spk2utt {
            utts.shuffle(&mut self.rng);
        }

        let counts: Vec<usize> = spk2utt.iter().map(Vec::len).collect();
        let train_counts = apportion(&counts, props.train);
        let test_counts: Vec<usize> = if props.is_complementary() {
            counts.iter().zip(&train_counts).map(|(n, t)| n - t).collect()
        } else {
            apportion(&counts, props.test)
                .into_iter()
                .zip(counts.iter().zip(&train_counts))
                .map(|(test, (n, train))| test.min(n - train))
                .collect()
        };

        let mut ids = SplitIds::default();
        for ((utts, n_train), n_test) in spk2utt.iter().zip(&train_counts).zip(&test_counts) {
            ids.train.extend(utts[..*n_train].iter().map(|u| u.to_string()));
            ids.test
                .extend(utts[*n_train..n_train + n_test].iter().map(|u| u.to_string()));
        }
        debug!(
            "split by speakers: {} train, {} test over {} speakers",
            ids.train.len(),
            ids.test.len(),
            counts.len()
        );
        Ok(ids)
    }

    /// Build and validate both sides of a partition
    fn materialize(&self, ids: SplitIds) -> Result<(Corpus, Corpus)> {
        let build = |side: &str, utts: &[String]| {
            self.corpus
                .subset_with(utts, self.prune, &self.validator)
                .map_err(|e| {
                    // A partition of a valid corpus always yields valid subsets
                    error!("{} subset of a split failed validation: {}", side, e);
                    e
                })
        };
        let train = build("train", &ids.train)?;
        let test = build("test", &ids.test)?;
        info!(
            "Split corpus into {} train and {} test utterances",
            train.utt2spk.len(),
            test.utt2spk.len()
        );
        Ok((train, test))
    }
}

/// Train and test sizes for `total` utterances
fn side_sizes(total: usize, props: &Proportions) -> (usize, usize) {
    let n_train = ((props.train * total as f64).round() as usize).min(total);
    let n_test = if props.is_complementary() {
        total - n_train
    } else {
        ((props.test * total as f64).round() as usize).min(total - n_train)
    };
    (n_train, n_test)
}

/// Largest-remainder apportionment of `prop * counts[i]`
///
/// Every share is the floor of its quota or one more, and the shares sum to
/// `round(prop * sum(counts))`. Ties go to the earlier index.
fn apportion(counts: &[usize], prop: f64) -> Vec<usize> {
    let quotas: Vec<f64> = counts.iter().map(|&n| n as f64 * prop).collect();
    let mut shares: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let target = (prop * counts.iter().sum::<usize>() as f64).round() as usize;
    let assigned: usize = shares.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut missing = target.saturating_sub(assigned);
    for i in order {
        if missing == 0 {
            break;
        }
        if shares[i] < counts[i] {
            shares[i] += 1;
            missing -= 1;
        }
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Segment;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    /// Corpus of `n_speakers` speakers, speaker `i` having `i + 1` utterances
    fn staircase_corpus(n_speakers: usize) -> Corpus {
        let mut corpus = Corpus::new();
        corpus.lexicon.insert("word".into(), "w".into());
        corpus.phones.insert("w".into(), "w".into());
        for spk in 0..n_speakers {
            let wav = format!("spk{}", spk);
            corpus
                .wavs
                .insert(wav.clone(), PathBuf::from(format!("/w/{}.wav", wav)));
            for utt in 0..=spk {
                corpus.add_utterance(
                    format!("spk{}_u{:02}", spk, utt),
                    Segment::timed(wav.clone(), utt as f64, utt as f64 + 1.0),
                    "word",
                    format!("spk{}", spk),
                );
            }
        }
        corpus
    }

    fn assert_partition(corpus: &Corpus, ids: &SplitIds) {
        let train: BTreeSet<&str> = ids.train.iter().map(String::as_str).collect();
        let test: BTreeSet<&str> = ids.test.iter().map(String::as_str).collect();
        assert_eq!(train.len(), ids.train.len(), "duplicate in train");
        assert_eq!(test.len(), ids.test.len(), "duplicate in test");
        assert!(train.is_disjoint(&test));
        let union: BTreeSet<&str> = train.union(&test).copied().collect();
        assert_eq!(union, corpus.utterances().into_iter().collect());
    }

    #[test]
    fn test_proportions_defaults() {
        assert_eq!(
            Proportions::resolve(None, None).unwrap(),
            Proportions { train: 0.5, test: 0.5 }
        );
        let p = Proportions::resolve(Some(0.8), None).unwrap();
        assert!((p.test - 0.2).abs() < 1e-12);
        assert!(p.is_complementary());
        let p = Proportions::resolve(None, Some(0.3)).unwrap();
        assert!((p.train - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_proportions_rejected() {
        for (train, test) in [
            (Some(-0.1), None),
            (Some(1.0), None),
            (None, Some(1.5)),
            (Some(0.7), Some(0.4)),
            (Some(f64::NAN), None),
        ] {
            assert!(
                matches!(
                    Proportions::resolve(train, test),
                    Err(CorpusError::Configuration(_))
                ),
                "{:?} / {:?} should be rejected",
                train,
                test
            );
        }
    }

    #[test]
    fn test_apportion_largest_remainder() {
        assert_eq!(apportion(&[3, 3, 3], 0.5), vec![2, 2, 1]);
        assert_eq!(apportion(&[4, 2], 0.5), vec![2, 1]);
        assert_eq!(apportion(&[1, 1, 1, 1], 0.25), vec![1, 0, 0, 0]);
        assert_eq!(apportion(&[], 0.5), Vec::<usize>::new());
    }

    #[test]
    fn test_split_is_partition() {
        let corpus = staircase_corpus(6);
        let ids = CorpusSplit::new(&corpus, Some(7), true)
            .split_ids(Some(0.7), None)
            .unwrap();
        assert_partition(&corpus, &ids);
        assert_eq!(ids.train.len(), (0.7f64 * 21.0).round() as usize);
    }

    #[test]
    fn test_split_by_speakers_is_partition() {
        let corpus = staircase_corpus(8);
        let ids = CorpusSplit::new(&corpus, Some(3), true)
            .split_by_speakers_ids(None, Some(0.25))
            .unwrap();
        assert_partition(&corpus, &ids);
    }

    #[test]
    fn test_split_by_speakers_half_within_one() {
        let corpus = staircase_corpus(9);
        let ids = CorpusSplit::new(&corpus, Some(11), true)
            .split_by_speakers_ids(Some(0.5), None)
            .unwrap();

        for (spk, utts) in corpus.speaker_to_utterances() {
            let n = utts.len() as f64;
            let in_train = ids
                .train
                .iter()
                .filter(|u| corpus.utt2spk[*u] == spk)
                .count() as f64;
            assert!((in_train - n / 2.0).abs() <= 1.0, "{}: {} of {}", spk, in_train, n);
        }
    }

    #[test]
    fn test_non_complementary_leaves_remainder_out() {
        let corpus = staircase_corpus(4);
        let ids = CorpusSplit::new(&corpus, Some(5), true)
            .split_ids(Some(0.5), Some(0.3))
            .unwrap();
        assert_eq!(ids.train.len(), 5);
        assert_eq!(ids.test.len(), 3);
        let train: BTreeSet<_> = ids.train.iter().collect();
        assert!(ids.test.iter().all(|u| !train.contains(u)));
    }

    #[test]
    fn test_same_seed_same_partition() {
        let corpus = staircase_corpus(5);
        let a = CorpusSplit::new(&corpus, Some(42), true)
            .split_by_speakers_ids(Some(0.6), None)
            .unwrap();
        let b = CorpusSplit::new(&corpus, Some(42), true)
            .split_by_speakers_ids(Some(0.6), None)
            .unwrap();
        assert_eq!(a, b);

        let c = CorpusSplit::new(&corpus, Some(42), true)
            .split_ids(None, None)
            .unwrap();
        let d = CorpusSplit::new(&corpus, Some(42), true)
            .split_ids(None, None)
            .unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_bad_proportions_fail_before_shuffling() {
        let corpus = staircase_corpus(2);
        let mut splitter = CorpusSplit::new(&corpus, Some(1), true);
        assert!(splitter.split(Some(0.9), Some(0.9)).is_err());
        assert!(splitter.split_by_speakers(Some(0.0), None).is_err());
    }

    #[test]
    fn test_from_config_validates_under_configured_policy() {
        let mut corpus = staircase_corpus(3);
        corpus.text.insert("spk2_u01".into(), "word <unk>".into());

        let mut config = CorpusConfig::default();
        config.split.random_seed = Some(4);
        assert!(CorpusSplit::from_config(&corpus, &config)
            .unwrap()
            .split(None, None)
            .is_err());

        config.validation.oov_marker = Some("<unk>".into());
        let (train, test) = CorpusSplit::from_config(&corpus, &config)
            .unwrap()
            .split(None, None)
            .unwrap();
        assert_eq!(train.utt2spk.len() + test.utt2spk.len(), 6);
    }

    #[test]
    fn test_from_config_rejects_unusable_validation_settings() {
        let corpus = staircase_corpus(2);
        let mut config = CorpusConfig::default();
        config.validation.njobs = 0;
        assert!(matches!(
            CorpusSplit::from_config(&corpus, &config),
            Err(CorpusError::Common(_))
        ));
    }

    #[test]
    fn test_split_materializes_valid_pruned_corpora() {
        let corpus = staircase_corpus(4);
        let validator = Validator::default().with_njobs(1);
        let (train, test) = CorpusSplit::new(&corpus, Some(9), true)
            .with_validator(validator.clone())
            .split_by_speakers(Some(0.5), None)
            .unwrap();

        validator.validate(&train).unwrap();
        validator.validate(&test).unwrap();
        assert_eq!(train.utt2spk.len() + test.utt2spk.len(), corpus.utt2spk.len());
        // Pruned: no orphaned wav on either side
        for side in [&train, &test] {
            assert!(side
                .wavs
                .keys()
                .all(|w| side.segments.values().any(|s| &s.wav_id == w)));
        }
    }
}
