//! Per-wav segment interval checks
//!
//! Each wav is checked independently, so the work is spread over a rayon
//! pool of `njobs` threads. Results are merged in wav id order: the
//! reported failure is the same whatever the worker count.

use crate::corpus::{preview, Corpus, UttSpan};
use crate::error::{CorpusError, Result};
use crate::probe::DurationProbe;
use phonocorp_common::ValidationConfig;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Slack allowed when comparing segment times (seconds)
const TIME_TOLERANCE: f64 = 1e-3;

struct WavJob<'a> {
    wav_id: &'a str,
    path: &'a Path,
    spans: &'a [UttSpan<'a>],
}

/// Check every wav referenced by `wav2utt`
///
/// Assumes every wav id in `wav2utt` is registered in `corpus.wavs`.
pub(super) fn check_all(
    corpus: &Corpus,
    wav2utt: &BTreeMap<&str, Vec<UttSpan<'_>>>,
    config: &ValidationConfig,
    probe: Option<&dyn DurationProbe>,
) -> Result<()> {
    let mut jobs = Vec::with_capacity(wav2utt.len());
    for (wav_id, spans) in wav2utt {
        let path = corpus.wavs.get(*wav_id).ok_or_else(|| {
            CorpusError::ReferentialIntegrity(format!("wav '{}' is not registered", wav_id))
        })?;
        jobs.push(WavJob {
            wav_id: *wav_id,
            path: path.as_path(),
            spans: spans.as_slice(),
        });
    }

    debug!(
        "Checking segment intervals of {} wav(s) with {} job(s)",
        jobs.len(),
        config.njobs
    );

    let results: Vec<Result<()>> = if config.njobs <= 1 || jobs.len() <= 1 {
        jobs.iter().map(|job| check_wav(job, config, probe)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.njobs)
            .build()
            .map_err(|e| CorpusError::WorkerPool(e.to_string()))?;
        pool.install(|| {
            jobs.par_iter()
                .map(|job| check_wav(job, config, probe))
                .collect()
        })
    };

    results.into_iter().collect()
}

fn check_wav(
    job: &WavJob<'_>,
    config: &ValidationConfig,
    probe: Option<&dyn DurationProbe>,
) -> Result<()> {
    let whole: Vec<&str> = job
        .spans
        .iter()
        .filter(|s| s.start == 0.0 && s.end.is_infinite())
        .map(|s| s.utt_id)
        .collect();
    if whole.len() > 1 {
        return Err(CorpusError::ReferentialIntegrity(format!(
            "wav '{}' holds more than one whole-file utterance: {}",
            job.wav_id,
            preview(whole.iter())
        )));
    }

    for span in job.spans {
        if span.start < 0.0 {
            return Err(CorpusError::ReferentialIntegrity(format!(
                "utterance '{}' starts at negative time {}",
                span.utt_id, span.start
            )));
        }
        if span.end.is_finite() && span.end <= span.start {
            return Err(CorpusError::ReferentialIntegrity(format!(
                "utterance '{}' ends ({}) before it starts ({})",
                span.utt_id, span.end, span.start
            )));
        }
    }

    let mut spans: Vec<UttSpan<'_>> = job.spans.to_vec();

    if let Some(probe) = probe {
        let info = probe.probe(job.path)?;
        if let Some(rate) = config.expected_sample_rate {
            if info.sample_rate != rate {
                warn!(
                    "wav '{}' is sampled at {} Hz, expected {} Hz",
                    job.wav_id, info.sample_rate, rate
                );
            }
        }

        for span in &mut spans {
            if span.start >= info.duration + TIME_TOLERANCE {
                return Err(CorpusError::ReferentialIntegrity(format!(
                    "utterance '{}' starts at {} past the end of wav '{}' ({:.3}s)",
                    span.utt_id, span.start, job.wav_id, info.duration
                )));
            }
            if span.end.is_infinite() {
                span.end = info.duration;
            } else if span.end > info.duration + TIME_TOLERANCE {
                return Err(CorpusError::ReferentialIntegrity(format!(
                    "utterance '{}' ends at {} past the end of wav '{}' ({:.3}s)",
                    span.utt_id, span.end, job.wav_id, info.duration
                )));
            }
        }
    }

    check_overlaps(job.wav_id, &mut spans)
}

/// Reject overlapping spans; touching spans are accepted
fn check_overlaps(wav_id: &str, spans: &mut [UttSpan<'_>]) -> Result<()> {
    spans.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

    let mut iter = spans.iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let mut furthest = first;
    for span in iter {
        if span.start < furthest.end - TIME_TOLERANCE {
            return Err(CorpusError::ReferentialIntegrity(format!(
                "utterances '{}' and '{}' overlap in wav '{}'",
                furthest.utt_id, span.utt_id, wav_id
            )));
        }
        if span.end > furthest.end {
            furthest = span;
        }
    }
    Ok(())
}
