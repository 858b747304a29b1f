//! Pass-1 search tokens: the per-(node, state) survivor Viterbi keeps.

use crate::lm::dfa::DfaState;
use crate::lm::ngram::WordId;

#[derive(Debug, Clone)]
pub struct Token {
    pub score: f32,
    /// Most recent word id, used for bigram lookup under the word-pair
    /// approximation pass 1 applies when `cfg.word_pair_approximation` is
    /// set (spec §4.4: pass 1 uses at most bigram context even when the LM
    /// is trained to higher order — the full order is reserved for pass 2's
    /// rescoring).
    pub last_word: Option<WordId>,
    /// Last phone of the most recently completed word, carried forward so a
    /// word-initial boundary node can resolve its left context exactly
    /// under `cfg.precise_cross_word_context` instead of falling back to a
    /// monophone.
    pub last_phone: Option<String>,
    /// Back-trellis index of the most recent word boundary this token
    /// passed through, so a completed word end can chain to its
    /// predecessor.
    pub back_word_end: Option<usize>,
    /// Current DFA grammar state, `None` under an N-gram LM. Updated at
    /// every word boundary via `DfaGrammar::try_transition`.
    pub dfa_state: Option<DfaState>,
}

impl Token {
    pub fn start(dfa_state: Option<DfaState>) -> Self {
        Self {
            score: 0.0,
            last_word: None,
            last_phone: None,
            back_word_end: None,
            dfa_state,
        }
    }

    pub fn better_than(&self, other: &Token) -> bool {
        self.score > other.score
    }
}
