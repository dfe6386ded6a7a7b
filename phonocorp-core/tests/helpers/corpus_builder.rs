//! Corpus fixtures

use phonocorp_core::{Corpus, Segment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const WORDS: &[(&str, &str)] = &[
    ("yeah", "y ae"),
    ("oh", "ow"),
    ("weeks", "w iy k s"),
    ("house", "h aw s"),
    ("mouse", "m aw s"),
    ("tea", "t iy"),
    ("<SIL>", "SIL"),
    // Never used by generated transcriptions
    ("zebra", "z iy b r ah"),
];

/// Three utterances, two speakers, one whole-file wav each
pub fn scenario_corpus() -> Corpus {
    let mut corpus = Corpus::new();
    for (utt, spk, text) in [
        ("u1", "spk_A", "yeah oh"),
        ("u2", "spk_A", "weeks"),
        ("u3", "spk_B", "house <SIL> tea"),
    ] {
        let wav = format!("w{}", &utt[1..]);
        corpus
            .wavs
            .insert(wav.clone(), PathBuf::from(format!("/corpus/wavs/{}.wav", wav)));
        corpus.add_utterance(utt, Segment::whole(wav), text, spk);
    }
    add_lexicon(&mut corpus);
    corpus
}

/// Randomly sized but valid corpus
///
/// Speaker `s` owns one wav holding between 1 and `max_utts` back-to-back
/// utterances.
pub fn synthetic_corpus(n_speakers: usize, max_utts: usize, seed: u64) -> Corpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut corpus = Corpus::new();
    let spoken: Vec<&str> = WORDS.iter().take(6).map(|(w, _)| *w).collect();

    for s in 0..n_speakers {
        let spk = format!("spk{:03}", s);
        let wav = format!("{}_session", spk);
        corpus
            .wavs
            .insert(wav.clone(), PathBuf::from(format!("/corpus/wavs/{}.wav", wav)));

        let n_utts = rng.gen_range(1..=max_utts);
        let mut t = 0.0;
        for u in 0..n_utts {
            let duration = rng.gen_range(0.5..3.0);
            let n_words = rng.gen_range(1..=4);
            let text: Vec<&str> = (0..n_words)
                .map(|_| spoken[rng.gen_range(0..spoken.len())])
                .collect();
            corpus.add_utterance(
                format!("{}_u{:03}", spk, u),
                Segment::timed(wav.clone(), t, t + duration),
                text.join(" "),
                spk.clone(),
            );
            t += duration;
        }
    }
    add_lexicon(&mut corpus);
    // Registered but unreferenced
    corpus
        .wavs
        .insert("orphan".into(), PathBuf::from("/corpus/wavs/orphan.wav"));
    corpus
}

fn add_lexicon(corpus: &mut Corpus) {
    for (word, pron) in WORDS {
        corpus.lexicon.insert(word.to_string(), pron.to_string());
    }
    for phone in ["y", "ae", "ow", "w", "iy", "k", "s", "h", "aw", "m", "t", "z", "b", "r", "ah"] {
        corpus.phones.insert(phone.to_string(), phone.to_string());
    }
    corpus.silences.insert("SIL".to_string());
}
