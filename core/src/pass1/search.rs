//! Pass 1: frame-synchronous Viterbi beam search over the WCHMM tree.
//!
//! One token per live `(node, state, predecessor-word)` triple is kept per
//! frame — the classic token-passing formulation (spec §4.4), generalized
//! from the teacher's `engine.rs` `best_path` DP (a best-path-per-position
//! array filled left to right) to a tree rather than a flat position array,
//! and from a single LM score per transition to a full acoustic+LM Viterbi
//! recursion. The predecessor-word component of the key is collapsed to a
//! constant when `cfg.word_pair_approximation` is set, merging tokens that
//! disagree only on which word preceded them (spec §4.4 step 3); left as-is
//! it keeps per-predecessor histories exact at the cost of a wider beam.
//!
//! Cross-word triphone context is only resolved where the WCHMM already
//! knows one side at build time; the still-unknown side falls back through
//! biphone to monophone (see [`crate::wchmm::Emission::resolve`]) unless
//! `cfg.precise_cross_word_context` is set, in which case a word-initial
//! boundary node resolves its left context from the actual predecessor
//! word's last phone rather than guessing. The right side of a boundary
//! (the word that will follow) is never known during frame-synchronous
//! search, so it always falls back — this asymmetry is a scope
//! simplification recorded in DESIGN.md.

use crate::acoustic::LikelihoodEngine;
use crate::am::AcousticModel;
use crate::config::{FactoringMode, RecognizerConfig};
use crate::error::{Result, LOG_ZERO};
use crate::feature::Utterance;
use crate::lexicon::Dictionary;
use crate::lm::dfa::DfaState;
use crate::lm::ngram::WordId;
use crate::lm::LanguageModel;
use crate::pass1::token::Token;
use crate::trellis::BackTrellis;
use crate::wchmm::{NodeId, Wchmm};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

pub struct Pass1Result {
    pub trellis: BackTrellis,
    pub best_final_score: f32,
    pub frames_searched: usize,
}

type ActiveKey = (NodeId, usize, Option<WordId>);
type Active = AHashMap<ActiveKey, Token>;

/// Builds the active-map key for `(node, state)` given the predecessor
/// word, collapsing the predecessor under the word-pair approximation.
fn active_key(cfg: &RecognizerConfig, node: NodeId, state: usize, last_word: Option<WordId>) -> ActiveKey {
    if cfg.word_pair_approximation {
        (node, state, None)
    } else {
        (node, state, last_word)
    }
}

#[allow(clippy::too_many_arguments)]
fn push_candidate(
    next: &mut Active,
    key: ActiveKey,
    score: f32,
    last_word: Option<WordId>,
    back_word_end: Option<usize>,
    last_phone: Option<String>,
    dfa_state: Option<DfaState>,
) {
    let token = Token {
        score,
        last_word,
        last_phone,
        back_word_end,
        dfa_state,
    };
    next.entry(key)
        .and_modify(|existing| {
            if token.better_than(existing) {
                *existing = token.clone();
            }
        })
        .or_insert(token);
}

pub fn run_pass1(
    wchmm: &Wchmm,
    dict: &Dictionary,
    am: &AcousticModel,
    lm: &LanguageModel,
    cfg: &RecognizerConfig,
    utterance: &Utterance,
) -> Result<Pass1Result> {
    let num_frames = utterance.len();
    let mut trellis = BackTrellis::new(num_frames);
    if num_frames == 0 {
        return Ok(Pass1Result {
            trellis,
            best_final_score: LOG_ZERO,
            frames_searched: 0,
        });
    }

    let start_dfa_state = lm.dfa().map(|grammar| grammar.start_state);
    let mut engine = LikelihoodEngine::new(am, cfg);
    let mut active: Active = AHashMap::new();
    for &child in wchmm.children(wchmm.root) {
        let key = active_key(cfg, child, 0, None);
        push_candidate(&mut active, key, 0.0, None, None, None, start_dfa_state);
    }

    let mut frames_searched = 0;
    for t in 0..num_frames {
        engine.begin_frame(t);
        let frame = &utterance.frames[t];
        let mut next: Active = AHashMap::new();

        for (&(node, state, _), token) in active.iter() {
            let wnode = wchmm.node(node);
            let logical = if cfg.precise_cross_word_context {
                wnode.emission.resolve(am, token.last_phone.as_deref(), None)
            } else {
                wnode.emission.resolve(am, None, None)
            };
            let num_states = am.num_states(&logical).max(1);
            let Some((self_loop, forward, skip)) = am.transitions(&logical) else {
                continue;
            };
            let out = engine.output_prob(&logical, state, frame);
            if out <= LOG_ZERO {
                continue;
            }

            let self_lp = self_loop.get(state).copied().unwrap_or(LOG_ZERO);
            push_candidate(
                &mut next,
                active_key(cfg, node, state, token.last_word),
                token.score + self_lp + out,
                token.last_word,
                token.back_word_end,
                token.last_phone.clone(),
                token.dfa_state,
            );

            if state + 1 < num_states {
                let fwd_lp = forward.get(state).copied().unwrap_or(LOG_ZERO);
                push_candidate(
                    &mut next,
                    active_key(cfg, node, state + 1, token.last_word),
                    token.score + fwd_lp + out,
                    token.last_word,
                    token.back_word_end,
                    token.last_phone.clone(),
                    token.dfa_state,
                );
                continue;
            }

            let exit_lp = forward.get(state).copied().unwrap_or(LOG_ZERO);
            let exit_score = token.score + exit_lp + out;
            expand_phone_exit(wchmm, dict, lm, cfg, &mut trellis, &mut next, node, t, exit_score, token);

            if let Some(skip_lp) = skip {
                if state == 0 {
                    let skip_score = token.score + skip_lp + out;
                    expand_phone_exit(wchmm, dict, lm, cfg, &mut trellis, &mut next, node, t, skip_score, token);
                }
            }
        }

        let frame_best = next
            .values()
            .map(|tok| OrderedFloat(tok.score))
            .max()
            .map(|v| v.0)
            .unwrap_or(LOG_ZERO);
        trellis.record_frame_best(t, frame_best);

        if next.is_empty() {
            debug!(frame = t, "pass 1 beam collapsed to zero hypotheses");
            break;
        }

        // LM factoring (spec §4.2 step 3 / §4.3): a node's look-ahead bound
        // is the best LM score reachable through any word in its subtree, so
        // a token that looks weak now but leads into a likely word survives
        // the cut a raw-score-only threshold would have applied.
        let threshold = frame_best - cfg.beam_width;
        next.retain(|&(node, _, _), tok| tok.score + wchmm.node(node).lookahead_max >= threshold);
        if let Some(limit) = cfg.hypo_count_limit {
            if next.len() > limit {
                let mut scored: Vec<(ActiveKey, Token)> = next.into_iter().collect();
                scored.sort_unstable_by_key(|(_, tok)| std::cmp::Reverse(OrderedFloat(tok.score)));
                scored.truncate(limit);
                next = scored.into_iter().collect();
            }
        }
        trace!(frame = t, hypotheses = next.len(), "pass 1 frame complete");

        active = next;
        frames_searched = t + 1;
    }

    let best_final_score = trellis.best_score_at(num_frames.saturating_sub(1));
    Ok(Pass1Result {
        trellis,
        best_final_score,
        frames_searched,
    })
}

/// Handles everything that happens when a token reaches the last state of
/// a phone: fanning into sibling phones within the same word, and, if this
/// node also completes a word, registering a back-trellis entry and
/// restarting the search at the tree root for the next word.
#[allow(clippy::too_many_arguments)]
fn expand_phone_exit(
    wchmm: &Wchmm,
    dict: &Dictionary,
    lm: &LanguageModel,
    cfg: &RecognizerConfig,
    trellis: &mut BackTrellis,
    next: &mut Active,
    node: NodeId,
    frame: usize,
    exit_score: f32,
    token: &Token,
) {
    let wnode = wchmm.node(node);
    for &child in &wnode.children {
        let key = active_key(cfg, child, 0, token.last_word);
        push_candidate(
            next,
            key,
            exit_score,
            token.last_word,
            token.back_word_end,
            token.last_phone.clone(),
            token.dfa_state,
        );
    }

    for &entry_idx in &wnode.word_ends {
        let Some(word) = dict.get(entry_idx) else {
            continue;
        };

        // DFA grammar hard filter (spec §4.3/§4.4 step 2): a word with no
        // category, or whose category has no admissible arc from the
        // token's current state, cannot complete here at all.
        let next_dfa_state = match lm.dfa() {
            Some(grammar) => {
                let Some(category) = word.category.as_deref() else {
                    continue;
                };
                let Some(state) = token.dfa_state else {
                    continue;
                };
                match grammar.try_transition(state, category) {
                    Some(next_state) => Some(next_state),
                    None => continue,
                }
            }
            None => None,
        };

        let lm_score = match cfg.factoring_mode {
            FactoringMode::Bigram => match token.last_word {
                Some(prev) => lm.transition_logprob(&[prev], word.word_id),
                None => lm.transition_logprob(&[], word.word_id),
            },
            FactoringMode::Unigram => lm.transition_logprob(&[], word.word_id),
        };
        let word_end_score = exit_score + lm_score + cfg.insertion_penalty;
        let we_idx = trellis.push(crate::trellis::WordEnd {
            word_id: word.word_id,
            entry_idx,
            frame,
            score: word_end_score,
            acoustic_only: exit_score - token.score,
            prev: token.back_word_end,
            dfa_state: next_dfa_state,
        });

        if let Some(grammar) = lm.dfa() {
            let state = next_dfa_state.expect("validated by try_transition above");
            if !grammar.is_accepting(state) && !grammar.has_admissible_words(state) {
                // Dead grammar branch: no continuation from here can ever
                // complete, so don't waste search restarting at the root.
                continue;
            }
        }

        let last_phone = word.phones.last().cloned();
        for &child in wchmm.children(wchmm.root) {
            let key = active_key(cfg, child, 0, Some(word.word_id));
            push_candidate(
                next,
                key,
                word_end_score,
                Some(word.word_id),
                Some(we_idx),
                last_phone.clone(),
                next_dfa_state,
            );
        }
    }
}
