//! The pronunciation dictionary: surface words and their phone sequences,
//! prior to WCHMM tree construction.
//!
//! Storage shape (a flat entry table plus a surface-form index) follows the
//! teacher's `Lexicon` in `core/src/lib.rs`, generalized from a single
//! pinyin-keyed FST index to a dictionary keyed by orthographic surface
//! form, since forced cross-language FST lookup has no analogue here.

use crate::lm::ngram::WordId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One dictionary entry: a surface form, its phone sequence (monophone
/// names; context is resolved later when building the WCHMM), and the
/// vocabulary id the language model scores it under.
///
/// `category` is only meaningful under a DFA grammar LM (spec §4.3/§4.4
/// step 2): it is the word-category label the grammar's arcs are keyed on,
/// and a word with no category can never complete a DFA-mode search since
/// no arc can admit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub surface: String,
    pub phones: Vec<String>,
    pub word_id: WordId,
    pub category: Option<String>,
}

impl Word {
    pub fn len_phones(&self) -> usize {
        self.phones.len()
    }

    pub fn is_short(&self, short_word_len: usize) -> bool {
        self.phones.len() <= short_word_len
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dictionary {
    pub entries: Vec<Word>,
    pub by_surface: HashMap<String, Vec<usize>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: Word) -> usize {
        let idx = self.entries.len();
        self.by_surface
            .entry(word.surface.clone())
            .or_default()
            .push(idx);
        self.entries.push(word);
        idx
    }

    pub fn lookup(&self, surface: &str) -> &[usize] {
        self.by_surface
            .get(surface)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, idx: usize) -> Option<&Word> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Word)> {
        self.entries.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_all_homographs() {
        let mut dict = Dictionary::new();
        dict.insert(Word {
            surface: "read".into(),
            phones: vec!["r".into(), "iy".into(), "d".into()],
            word_id: 0,
            category: None,
        });
        dict.insert(Word {
            surface: "read".into(),
            phones: vec!["r".into(), "eh".into(), "d".into()],
            word_id: 1,
            category: None,
        });
        assert_eq!(dict.lookup("read").len(), 2);
        assert!(dict.lookup("missing").is_empty());
    }
}
