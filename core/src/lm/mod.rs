//! Language model abstraction: either a statistical N-gram or a grammar DFA
//! (spec §4.3 [MODULE] LM). Both directions give pass 1 and pass 2 a
//! uniform `transition_logprob`/`admits` surface so the search code does
//! not need to branch on LM kind.

pub mod dfa;
pub mod ngram;

use dfa::DfaGrammar;
use ngram::{NgramModel, WordId};
use serde::{Deserialize, Serialize};

/// Which direction an N-gram table was trained in. Julius trains pass-2's
/// rescoring LM backward (right word predicts left context) to make
/// best-first stack decoding's incremental extension cheap; pass 1 needs a
/// forward table, derived on load (spec §4.3, see
/// [`NgramModel::derive_forward_bigram`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LmDirection {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone)]
pub enum LanguageModel {
    Ngram(NgramModel),
    Dfa(DfaGrammar),
}

impl LanguageModel {
    /// Log-probability of extending `history` (most recent word last) with
    /// `next`. DFA grammars are non-probabilistic: admissibility is a hard
    /// filter applied separately via [`LanguageModel::dfa`], not a score, so
    /// every transition costs 0.0 here.
    pub fn transition_logprob(&self, history: &[WordId], next: WordId) -> f32 {
        match self {
            LanguageModel::Ngram(ngram) => match history.len() {
                0 => ngram.unigram_logprob(next),
                1 => ngram.forward_bigram_logprob(history[0], next),
                _ => {
                    let n = history.len();
                    ngram.trigram_logprob(history[n - 2], history[n - 1], next)
                }
            },
            LanguageModel::Dfa(_) => 0.0,
        }
    }

    /// Total log-probability of a full word sequence, used by pass-2 to
    /// report a final LM score independent of the incremental one
    /// accumulated during search.
    pub fn score_sequence(&self, words: &[WordId]) -> f32 {
        match self {
            LanguageModel::Ngram(ngram) => ngram.score_sequence(words),
            LanguageModel::Dfa(_) => 0.0,
        }
    }

    pub fn is_ngram(&self) -> bool {
        matches!(self, LanguageModel::Ngram(_))
    }

    pub fn dfa(&self) -> Option<&DfaGrammar> {
        match self {
            LanguageModel::Dfa(grammar) => Some(grammar),
            LanguageModel::Ngram(_) => None,
        }
    }
}
