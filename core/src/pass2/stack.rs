//! Pass 2: best-first stack decoding over the back-trellis.
//!
//! Pass 1 already discovered which word sequences are even reachable (the
//! trellis's forward `prev` links); pass 2's job is to rescore those
//! chains with the LM's full order instead of pass 1's bigram/unigram
//! approximation, and to rank the results with an admissible heuristic so
//! the true best hypothesis is found without exhaustively rescoring every
//! chain (spec §4.5).

use crate::config::RecognizerConfig;
use crate::lm::dfa::DfaState;
use crate::lm::ngram::WordId;
use crate::lm::LanguageModel;
use crate::trellis::BackTrellis;
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub word_ids: Vec<WordId>,
    pub entries: Vec<usize>,
    pub end_frame: usize,
    pub score: f32,
    pub dfa_state: Option<DfaState>,
}

struct QueueItem {
    priority: OrderedFloat<f32>,
    last_entry: Option<usize>,
    hypo: Hypothesis,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}
impl Eq for QueueItem {}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

pub struct StackDecoder<'a> {
    trellis: &'a BackTrellis,
    lm: &'a LanguageModel,
    cfg: &'a RecognizerConfig,
    children_of: AHashMap<usize, Vec<usize>>,
    final_frame: usize,
}

impl<'a> StackDecoder<'a> {
    pub fn new(trellis: &'a BackTrellis, lm: &'a LanguageModel, cfg: &'a RecognizerConfig) -> Self {
        let mut children_of: AHashMap<usize, Vec<usize>> = AHashMap::new();
        for (idx, entry) in trellis.entries.iter().enumerate() {
            if let Some(prev) = entry.prev {
                children_of.entry(prev).or_default().push(idx);
            }
        }
        Self {
            trellis,
            lm,
            cfg,
            children_of,
            final_frame: trellis.num_frames().saturating_sub(1),
        }
    }

    /// Whether a hypothesis with no linked continuation at `frame` should be
    /// reported as a completed result. It must fall within the acceptance
    /// envelope of the utterance's end, satisfy DFA grammar acceptance when
    /// the LM is a grammar, and — short of the very last frame — have no
    /// other word ending nearby that token merging might have orphaned this
    /// chain from (spec §4.5 step 2 / §8 window property).
    fn is_complete(&self, frame: usize, dfa_state: Option<DfaState>) -> bool {
        if self.final_frame.saturating_sub(frame) > self.cfg.envelope_width {
            return false;
        }
        if let Some(grammar) = self.lm.dfa() {
            match dfa_state {
                Some(state) if grammar.is_accepting(state) => {}
                _ => return false,
            }
        }
        if frame + 1 > self.final_frame {
            return true;
        }
        let window_end = (frame + self.cfg.lookup_range).min(self.final_frame);
        self.trellis.words_in_window(frame + 1, window_end).is_empty()
    }

    fn heuristic(&self, frame: usize) -> f32 {
        self.trellis.best_score_at(self.final_frame) - self.trellis.best_score_at(frame)
    }

    fn lm_history<'h>(&self, word_ids: &'h [WordId]) -> &'h [WordId] {
        let n = word_ids.len();
        &word_ids[n.saturating_sub(2)..n]
    }

    /// Trims the heap down to `cfg.stack_size` by keeping only the
    /// highest-priority items, enforcing the bound pass 2's stack is meant
    /// to respect (spec §4.4/§4.5 "enforce stack_size").
    fn enforce_stack_size(&self, heap: &mut BinaryHeap<QueueItem>) {
        if heap.len() <= self.cfg.stack_size {
            return;
        }
        let mut items: Vec<QueueItem> = std::mem::take(heap).into_vec();
        items.sort_unstable_by(|a, b| b.priority.cmp(&a.priority));
        items.truncate(self.cfg.stack_size);
        *heap = items.into_iter().collect();
    }

    /// Runs best-first search until `cfg.nbest` complete hypotheses are
    /// found or `cfg.hypo_overflow` expansions are spent, returning
    /// hypotheses in descending score order.
    pub fn run(&self) -> Vec<Hypothesis> {
        let mut heap: BinaryHeap<QueueItem> = BinaryHeap::new();
        let mut complete: Vec<Hypothesis> = Vec::new();

        for (idx, entry) in self.trellis.entries.iter().enumerate() {
            if entry.prev.is_some() {
                continue;
            }
            let lm_score = self.lm.transition_logprob(&[], entry.word_id);
            let score = entry.acoustic_only + lm_score + self.cfg.insertion_penalty;
            let hypo = Hypothesis {
                word_ids: vec![entry.word_id],
                entries: vec![entry.entry_idx],
                end_frame: entry.frame,
                score,
                dfa_state: entry.dfa_state,
            };
            heap.push(QueueItem {
                priority: OrderedFloat(score + self.heuristic(entry.frame)),
                last_entry: Some(idx),
                hypo,
            });
        }

        let mut expansions = 0usize;
        while let Some(QueueItem { hypo, last_entry, .. }) = heap.pop() {
            expansions += 1;
            if expansions > self.cfg.hypo_overflow {
                break;
            }

            let children = last_entry
                .and_then(|idx| self.children_of.get(&idx))
                .filter(|c| !c.is_empty());
            match children {
                None => {
                    if self.is_complete(hypo.end_frame, hypo.dfa_state) {
                        complete.push(hypo);
                        if complete.len() >= self.cfg.nbest * 4 {
                            break;
                        }
                    }
                }
                Some(children) => {
                    for &child_idx in children {
                        let entry = self.trellis.entry(child_idx);
                        let mut word_ids = hypo.word_ids.clone();
                        word_ids.push(entry.word_id);
                        let history = self.lm_history(&hypo.word_ids);
                        let lm_score = self.lm.transition_logprob(history, entry.word_id);
                        let score = hypo.score + entry.acoustic_only + lm_score + self.cfg.insertion_penalty;
                        let mut entries = hypo.entries.clone();
                        entries.push(entry.entry_idx);
                        let next = Hypothesis {
                            word_ids,
                            entries,
                            end_frame: entry.frame,
                            score,
                            dfa_state: entry.dfa_state,
                        };
                        heap.push(QueueItem {
                            priority: OrderedFloat(score + self.heuristic(entry.frame)),
                            last_entry: Some(child_idx),
                            hypo: next,
                        });
                    }
                }
            }
            self.enforce_stack_size(&mut heap);
        }

        complete.sort_unstable_by_key(|h| std::cmp::Reverse(OrderedFloat(h.score)));
        complete.truncate(self.cfg.nbest);
        complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lm::ngram::NgramModel;
    use crate::trellis::WordEnd;

    #[test]
    fn single_chain_completes() {
        let mut trellis = BackTrellis::new(3);
        let first = trellis.push(WordEnd {
            word_id: 0,
            entry_idx: 0,
            frame: 0,
            score: -1.0,
            acoustic_only: -1.0,
            prev: None,
            dfa_state: None,
        });
        trellis.push(WordEnd {
            word_id: 1,
            entry_idx: 1,
            frame: 2,
            score: -2.0,
            acoustic_only: -1.0,
            prev: Some(first),
            dfa_state: None,
        });
        trellis.record_frame_best(0, -1.0);
        trellis.record_frame_best(2, -2.0);
        let lm = LanguageModel::Ngram(NgramModel::new());
        let cfg = RecognizerConfig::default();
        let decoder = StackDecoder::new(&trellis, &lm, &cfg);
        let results = decoder.run();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].word_ids, vec![0, 1]);
    }

    #[test]
    fn insertion_penalty_is_applied_per_word_and_combines_with_skip_arcs() {
        let mut trellis = BackTrellis::new(3);
        let first = trellis.push(WordEnd {
            word_id: 0,
            entry_idx: 0,
            frame: 0,
            score: -1.0,
            // Mirrors a word whose exit used a skip arc: the acoustic
            // contribution already reflects one fewer state traversed.
            acoustic_only: -0.5,
            prev: None,
            dfa_state: None,
        });
        trellis.push(WordEnd {
            word_id: 1,
            entry_idx: 1,
            frame: 2,
            score: -2.0,
            acoustic_only: -1.0,
            prev: Some(first),
            dfa_state: None,
        });
        trellis.record_frame_best(0, -0.5);
        trellis.record_frame_best(2, -1.5);
        let lm = LanguageModel::Ngram(NgramModel::new());
        let cfg = RecognizerConfig {
            insertion_penalty: -3.0,
            ..Default::default()
        };
        let decoder = StackDecoder::new(&trellis, &lm, &cfg);
        let results = decoder.run();
        assert_eq!(results.len(), 1);
        // Two words, each charged the penalty once, on top of the
        // unigram/bigram LM scores and the skip-arc acoustic contribution.
        let expected_lm: f32 = lm.transition_logprob(&[], 0) + lm.transition_logprob(&[0], 1);
        let expected = -0.5 + -1.0 + expected_lm + 2.0 * cfg.insertion_penalty;
        assert!((results[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn dfa_grammar_rejects_hypotheses_that_never_reach_an_accepting_state() {
        use crate::lm::dfa::{DfaArc, DfaGrammar};
        use std::collections::HashSet;

        let mut trellis = BackTrellis::new(2);
        trellis.push(WordEnd {
            word_id: 0,
            entry_idx: 0,
            frame: 0,
            score: -1.0,
            acoustic_only: -1.0,
            prev: None,
            dfa_state: Some(0), // never reached the accepting state 1
        });
        trellis.record_frame_best(0, -1.0);
        let grammar = DfaGrammar {
            start_state: 0,
            accept_states: HashSet::from([1]),
            arcs: vec![
                vec![DfaArc {
                    category: "NOUN".into(),
                    next_state: 1,
                }],
                vec![],
            ],
            category_words: category_words_for(0, "NOUN"),
        };
        let lm = LanguageModel::Dfa(grammar);
        let cfg = RecognizerConfig::default();
        let decoder = StackDecoder::new(&trellis, &lm, &cfg);
        assert!(decoder.run().is_empty());
    }

    fn category_words_for(
        word_id: WordId,
        category: &str,
    ) -> std::collections::HashMap<String, std::collections::HashSet<WordId>> {
        std::collections::HashMap::from([(category.to_string(), std::collections::HashSet::from([word_id]))])
    }
}
