//! Back-off N-gram language model.
//!
//! Storage shape and floor-probability convention follow the teacher's
//! `word_bigram.rs` (`HashMap` keyed by history, -20.0 floor for unseen
//! pairs) and `ngram.rs` (separate unigram/bigram/trigram tables with
//! explicit back-off weights), generalized from Chinese word pairs to
//! arbitrary-order word N-grams with interpolation replaced by the
//! standard Katz-style back-off Julius trains (spec §4.3).

use crate::error::LOG_ZERO;
use crate::lm::LmDirection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type WordId = u32;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NgramModel {
    pub vocab: HashMap<String, WordId>,
    pub words: Vec<String>,
    pub unigram: HashMap<WordId, f32>,
    pub bigram: HashMap<(WordId, WordId), f32>,
    pub bigram_backoff: HashMap<WordId, f32>,
    pub trigram: HashMap<(WordId, WordId, WordId), f32>,
    pub trigram_backoff: HashMap<(WordId, WordId), f32>,
    /// Log-probability floor for entirely unseen histories/words.
    pub floor: f32,
    /// Direction `bigram` was trained in. Forward by default; set via
    /// [`NgramModel::with_direction`] when loading a backward-trained table.
    pub direction: LmDirection,
    /// Forward bigram table derived from `bigram` when `direction` is
    /// `Backward`, populated by [`NgramModel::with_direction`]. Pass 1's
    /// frame-synchronous search always wants a forward table regardless of
    /// how the model was trained.
    pub derived_forward_bigram: Option<HashMap<(WordId, WordId), f32>>,
}

impl NgramModel {
    pub fn new() -> Self {
        Self {
            floor: -20.0,
            ..Default::default()
        }
    }

    /// Declares the direction `bigram` was trained in. If `Backward`, derives
    /// and caches the forward table immediately so every later lookup is a
    /// plain hash-map read rather than a rederivation.
    pub fn with_direction(mut self, direction: LmDirection) -> Self {
        self.direction = direction;
        if direction == LmDirection::Backward {
            self.derived_forward_bigram = Some(self.derive_forward_bigram());
        }
        self
    }

    /// `P(w2 | w1)` using whichever table is actually in forward direction:
    /// the derived one when `bigram` was trained backward, `bigram` itself
    /// otherwise.
    pub fn forward_bigram_logprob(&self, w1: WordId, w2: WordId) -> f32 {
        match &self.derived_forward_bigram {
            Some(forward) => forward
                .get(&(w1, w2))
                .copied()
                .unwrap_or_else(|| self.unigram_logprob(w2)),
            None => self.bigram_logprob(w1, w2),
        }
    }

    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.vocab.get(word).copied()
    }

    pub fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.vocab.get(word) {
            return id;
        }
        let id = self.words.len() as WordId;
        self.words.push(word.to_string());
        self.vocab.insert(word.to_string(), id);
        id
    }

    pub fn unigram_logprob(&self, w: WordId) -> f32 {
        self.unigram.get(&w).copied().unwrap_or(self.floor)
    }

    /// `P(w2 | w1)` with back-off to the unigram when the pair is unseen.
    pub fn bigram_logprob(&self, w1: WordId, w2: WordId) -> f32 {
        if let Some(&p) = self.bigram.get(&(w1, w2)) {
            return p;
        }
        let bo = self.bigram_backoff.get(&w1).copied().unwrap_or(0.0);
        bo + self.unigram_logprob(w2)
    }

    /// `P(w3 | w1, w2)` with back-off to bigram then unigram.
    pub fn trigram_logprob(&self, w1: WordId, w2: WordId, w3: WordId) -> f32 {
        if let Some(&p) = self.trigram.get(&(w1, w2, w3)) {
            return p;
        }
        let bo = self.trigram_backoff.get(&(w1, w2)).copied().unwrap_or(0.0);
        bo + self.bigram_logprob(w2, w3)
    }

    /// Total log-probability of a word sequence under the highest order
    /// table available, used by pass-2 rescoring.
    pub fn score_sequence(&self, words: &[WordId]) -> f32 {
        let mut score = 0.0;
        for (i, &w) in words.iter().enumerate() {
            score += match i {
                0 => self.unigram_logprob(w),
                1 => self.bigram_logprob(words[0], w),
                _ => self.trigram_logprob(words[i - 2], words[i - 1], w),
            };
        }
        score
    }

    /// Derives a forward bigram table (`P(w2|w1)`) from a backward-trained
    /// one (`P(w1|w2)`) via Bayes' rule:
    /// `P(w2|w1) = P(w1|w2) * P(w2) / P(w1)`.
    ///
    /// Julius stores pass-2's LM backward (for right-to-left trigram
    /// rescoring) but pass-1's frame-synchronous search needs a forward
    /// bigram; this mirrors `original_source/libsent/src/ngram`'s
    /// backward-to-forward conversion rather than requiring two trained
    /// models (spec §4.3 Non-goals clarify only that file parsing is out of
    /// scope, not this derivation).
    pub fn derive_forward_bigram(&self) -> HashMap<(WordId, WordId), f32> {
        let mut forward = HashMap::with_capacity(self.bigram.len());
        for (&(w1, w2), &backward_logprob) in &self.bigram {
            let logprob = backward_logprob + self.unigram_logprob(w2) - self.unigram_logprob(w1);
            forward.insert((w1, w2), logprob.max(LOG_ZERO));
        }
        forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_falls_through_to_unigram() {
        let mut lm = NgramModel::new();
        let a = lm.intern("a");
        let b = lm.intern("b");
        lm.unigram.insert(a, -1.0);
        lm.unigram.insert(b, -2.0);
        lm.bigram_backoff.insert(a, -0.5);
        assert_eq!(lm.bigram_logprob(a, b), -0.5 + -2.0);
    }

    #[test]
    fn trigram_falls_through_two_levels() {
        let mut lm = NgramModel::new();
        let a = lm.intern("a");
        let b = lm.intern("b");
        let c = lm.intern("c");
        lm.unigram.insert(c, -3.0);
        assert_eq!(lm.trigram_logprob(a, b, c), -3.0);
    }

    #[test]
    fn unseen_unigram_hits_floor() {
        let lm = NgramModel::new();
        assert_eq!(lm.unigram_logprob(42), lm.floor);
    }

    #[test]
    fn forward_bigram_is_derived_when_trained_backward() {
        let mut lm = NgramModel::new();
        let a = lm.intern("a");
        let b = lm.intern("b");
        lm.unigram.insert(a, -1.0);
        lm.unigram.insert(b, -2.0);
        // bigram stored backward: P(a | b).
        lm.bigram.insert((b, a), -0.5);
        let lm = lm.with_direction(LmDirection::Backward);
        let expected = -0.5 + lm.unigram_logprob(a) - lm.unigram_logprob(b);
        assert_eq!(lm.forward_bigram_logprob(b, a), expected);
        // Forward direction leaves the raw bigram table untouched.
        let forward_only = NgramModel::new();
        assert_eq!(
            forward_only.forward_bigram_logprob(a, b),
            forward_only.bigram_logprob(a, b)
        );
    }
}
