//! Grammar-based language model: a deterministic finite automaton over word
//! categories, as an alternative to the statistical N-gram (spec §4.3,
//! grounded on `original_source/libjulius/src/dfa_decode.c` and the
//! category-pair table built by `gramtools`).

use crate::lm::ngram::WordId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type DfaState = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfaArc {
    pub category: String,
    pub next_state: DfaState,
}

/// A word-category grammar: states accept an incoming category and move to
/// a successor state; a word is admissible in a given state only if its
/// category has an outgoing arc there. The category a word belongs to is
/// carried on the lexicon entry itself (`Word::category`), not duplicated
/// here, so `try_transition` takes the category straight from the word
/// being considered for completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DfaGrammar {
    pub start_state: DfaState,
    pub accept_states: HashSet<DfaState>,
    pub arcs: Vec<Vec<DfaArc>>,
    /// Which words belong to each category, for lexicon-side filtering and
    /// for telling a dead grammar state (reachable but with no lexicon
    /// entry in any admissible category) from a live one.
    pub category_words: HashMap<String, HashSet<WordId>>,
}

impl DfaGrammar {
    pub fn num_states(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_accepting(&self, state: DfaState) -> bool {
        self.accept_states.contains(&state)
    }

    /// Whether `category` has an arc out of `state`; if so, returns the
    /// successor state.
    pub fn try_transition(&self, state: DfaState, category: &str) -> Option<DfaState> {
        self.arcs
            .get(state)?
            .iter()
            .find(|arc| arc.category == category)
            .map(|arc| arc.next_state)
    }

    /// All categories reachable from `state` in one step, used by pass-1 to
    /// restrict which lexicon words are even worth expanding.
    pub fn admissible_categories(&self, state: DfaState) -> impl Iterator<Item = &str> {
        self.arcs
            .get(state)
            .into_iter()
            .flatten()
            .map(|arc| arc.category.as_str())
    }

    /// Whether any category admissible from `state` actually has a lexicon
    /// entry behind it. A state that fails this (and isn't accepting) can
    /// never lead to a completed hypothesis, so pass 1 can stop expanding
    /// through it.
    pub fn has_admissible_words(&self, state: DfaState) -> bool {
        self.admissible_categories(state).any(|category| {
            self.category_words
                .get(category)
                .is_some_and(|words| !words.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_respects_category() {
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
            category_words: HashMap::from([("NOUN".to_string(), HashSet::from([7]))]),
        };
        assert_eq!(grammar.try_transition(0, "NOUN"), Some(1));
        assert_eq!(grammar.try_transition(0, "VERB"), None);
        assert!(grammar.is_accepting(1));
    }

    #[test]
    fn dead_state_has_no_admissible_words() {
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
            category_words: HashMap::new(),
        };
        assert!(!grammar.has_admissible_words(0));
        assert!(!grammar.has_admissible_words(1));
    }
}
