//! Result formatting and forced alignment.
//!
//! Forced alignment (spec §4.6 "viterbi_segment") re-runs a constrained,
//! single-path Viterbi over a known word sequence's flattened HMM chain —
//! unlike pass 1/2's search over the whole lexicon tree, both cross-word
//! neighbors are known exactly here, so phone context resolves precisely
//! rather than falling back through biphone/monophone.

use crate::acoustic::LikelihoodEngine;
use crate::am::AcousticModel;
use crate::config::RecognizerConfig;
use crate::error::{DecoderError, Result, LOG_ZERO};
use crate::feature::Utterance;
use crate::lexicon::{Dictionary, Word};
use crate::lm::ngram::WordId;
use crate::lm::LanguageModel;
use crate::pass2::ConfusionNetwork;

#[derive(Debug, Clone)]
pub struct AlignedPhone {
    pub logical_name: String,
    pub word_entry_idx: usize,
    pub start_frame: usize,
    pub end_frame: usize,
}

#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub entries: Vec<usize>,
    pub word_ids: Vec<WordId>,
    pub score: f32,
    pub confidence: f32,
    /// Whole-sequence score under the full language model (spec §4.5),
    /// reported alongside the search score `score` so a caller can see the
    /// LM's independent judgement of the hypothesis.
    pub lm_score: f32,
    pub alignment: Option<Vec<AlignedPhone>>,
}

struct FlatState {
    logical_name: String,
    word_entry_idx: usize,
    local_state: usize,
    phone_idx: usize,
}

fn flatten_chain(words: &[&Word], am: &AcousticModel, entries: &[usize]) -> Vec<FlatState> {
    let mut flat = Vec::new();
    let mut phone_idx = 0usize;
    for (w_pos, w) in words.iter().enumerate() {
        let n = w.phones.len();
        for i in 0..n {
            let left = if i == 0 {
                prev_word_last_phone(words, w_pos)
            } else {
                Some(w.phones[i - 1].clone())
            };
            let right = if i == n - 1 {
                next_word_first_phone(words, w_pos)
            } else {
                Some(w.phones[i + 1].clone())
            };
            let logical_name = match (left, right) {
                (Some(l), Some(r)) => am.resolve_dynamic_context(&l, &w.phones[i], &r),
                (Some(l), None) => am.resolve_dynamic_context(&l, &w.phones[i], &w.phones[i]),
                (None, Some(r)) => am.resolve_dynamic_context(&w.phones[i], &w.phones[i], &r),
                (None, None) => w.phones[i].clone(),
            };
            let num_states = am.num_states(&logical_name).max(1);
            for local_state in 0..num_states {
                flat.push(FlatState {
                    logical_name: logical_name.clone(),
                    word_entry_idx: entries[w_pos],
                    local_state,
                    phone_idx,
                });
            }
            phone_idx += 1;
        }
    }
    flat
}

fn prev_word_last_phone(words: &[&Word], pos: usize) -> Option<String> {
    pos.checked_sub(1).and_then(|p| words.get(p)).and_then(|w| w.phones.last().cloned())
}

fn next_word_first_phone(words: &[&Word], pos: usize) -> Option<String> {
    words.get(pos + 1).and_then(|w| w.phones.first().cloned())
}

/// Forced Viterbi alignment of a fixed word sequence against `utterance`,
/// returning per-phone frame boundaries.
pub fn forced_align(
    words: &[&Word],
    entries: &[usize],
    am: &AcousticModel,
    cfg: &RecognizerConfig,
    utterance: &Utterance,
) -> Result<Vec<AlignedPhone>> {
    let flat = flatten_chain(words, am, entries);
    if flat.is_empty() || utterance.is_empty() {
        return Err(DecoderError::InvalidAcousticModel(
            "forced alignment requires a non-empty word sequence and utterance".into(),
        ));
    }
    let num_states = flat.len();
    let num_frames = utterance.len();
    if num_frames < num_states {
        return Err(DecoderError::InvalidAcousticModel(format!(
            "utterance has {num_frames} frames, too few for {num_states} HMM states"
        )));
    }

    let mut engine = LikelihoodEngine::new(am, cfg);
    let mut dp = vec![vec![LOG_ZERO; num_states]; num_frames];
    // back[t][s] = true if the best path into (t, s) came from (t-1, s-1); false for (t-1, s)
    let mut back = vec![vec![false; num_states]; num_frames];

    let transitions: Vec<(f32, f32)> = flat
        .iter()
        .map(|fs| {
            am.transitions(&fs.logical_name)
                .map(|(self_lp, fwd_lp, _)| {
                    (
                        self_lp.get(fs.local_state).copied().unwrap_or(LOG_ZERO),
                        fwd_lp.get(fs.local_state).copied().unwrap_or(LOG_ZERO),
                    )
                })
                .unwrap_or((LOG_ZERO, LOG_ZERO))
        })
        .collect();

    engine.begin_frame(0);
    let frame0 = &utterance.frames[0];
    dp[0][0] = engine.output_prob(&flat[0].logical_name, flat[0].local_state, frame0);

    for t in 1..num_frames {
        engine.begin_frame(t);
        let frame = &utterance.frames[t];
        for s in 0..num_states {
            let out = engine.output_prob(&flat[s].logical_name, flat[s].local_state, frame);
            if out <= LOG_ZERO {
                continue;
            }
            let stay = dp[t - 1][s] + transitions[s].0;
            let advance = if s > 0 {
                dp[t - 1][s - 1] + transitions[s - 1].1
            } else {
                LOG_ZERO
            };
            if advance > stay {
                dp[t][s] = advance + out;
                back[t][s] = true;
            } else {
                dp[t][s] = stay + out;
                back[t][s] = false;
            }
        }
    }

    if dp[num_frames - 1][num_states - 1] <= LOG_ZERO {
        return Err(DecoderError::InvalidAcousticModel(
            "forced alignment failed to reach the final state".into(),
        ));
    }

    let mut state_at_frame = vec![0usize; num_frames];
    let mut s = num_states - 1;
    for t in (0..num_frames).rev() {
        state_at_frame[t] = s;
        if t > 0 && back[t][s] {
            s -= 1;
        }
    }

    let mut aligned = Vec::new();
    let mut phone_start = 0usize;
    let mut current_phone = flat[0].phone_idx;
    for t in 0..num_frames {
        let s = state_at_frame[t];
        let phone_idx = flat[s].phone_idx;
        if phone_idx != current_phone {
            aligned.push(AlignedPhone {
                logical_name: flat[state_at_frame[t - 1]].logical_name.clone(),
                word_entry_idx: flat[state_at_frame[t - 1]].word_entry_idx,
                start_frame: phone_start,
                end_frame: t - 1,
            });
            phone_start = t;
            current_phone = phone_idx;
        }
    }
    aligned.push(AlignedPhone {
        logical_name: flat[state_at_frame[num_frames - 1]].logical_name.clone(),
        word_entry_idx: flat[state_at_frame[num_frames - 1]].word_entry_idx,
        start_frame: phone_start,
        end_frame: num_frames - 1,
    });
    Ok(aligned)
}

/// Renders results in Julius's plain-text module-output style (spec §6):
/// one `sentenceN`/`wseqN`/`phseqN`/`cmscoreN`/`scoreN` block per result.
pub fn format_plain_text(results: &[RecognitionResult], dict: &Dictionary) -> String {
    let mut out = String::new();
    for (n, result) in results.iter().enumerate() {
        let surfaces: Vec<&str> = result
            .entries
            .iter()
            .filter_map(|&idx| dict.get(idx))
            .map(|w| w.surface.as_str())
            .collect();
        out.push_str(&format!("sentence{n}: {}\n", surfaces.join(" ")));
        out.push_str(&format!("wseq{n}: {}\n", surfaces.join(" ")));
        if let Some(alignment) = &result.alignment {
            let phones: Vec<&str> = alignment.iter().map(|p| p.logical_name.as_str()).collect();
            out.push_str(&format!("phseq{n}: {}\n", phones.join(" ")));
        }
        out.push_str(&format!("cmscore{n}: {:.3}\n", result.confidence));
        out.push_str(&format!("score{n}: {:.3}\n", result.score));
        out.push_str(&format!("lmscore{n}: {:.3}\n", result.lm_score));
    }
    out
}

/// Builds the confidence-bearing [`RecognitionResult`] list from pass 2's
/// n-best hypotheses plus the confusion network that supplies per-word
/// posterior confidence.
pub fn build_results(
    hypotheses: &[crate::pass2::Hypothesis],
    confusion: &ConfusionNetwork,
    lm: &LanguageModel,
) -> Vec<RecognitionResult> {
    hypotheses
        .iter()
        .map(|hypo| {
            let confidence = if confusion.bins.is_empty() {
                1.0
            } else {
                let sum: f32 = confusion
                    .bins
                    .iter()
                    .zip(hypo.word_ids.iter())
                    .map(|(bin, w)| {
                        bin.candidates
                            .iter()
                            .find(|(cw, _)| cw == w)
                            .map(|(_, mass)| *mass)
                            .unwrap_or(0.0)
                    })
                    .sum();
                sum / confusion.bins.len().max(1) as f32
            };
            RecognitionResult {
                entries: hypo.entries.clone(),
                word_ids: hypo.word_ids.clone(),
                score: hypo.score,
                confidence,
                lm_score: lm.score_sequence(&hypo.word_ids),
                alignment: None,
            }
        })
        .collect()
}
