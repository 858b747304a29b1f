//! The back-trellis: pass 1's output and pass 2's input.
//!
//! A sparse, per-frame record of "word W ended here with score S, having
//! come from word-end record P" (spec §4.4), plus the frame-indexed best
//! survivor score pass 1 tracked regardless of word boundaries — the
//! admissible heuristic pass 2's stack decoder uses to estimate the cost of
//! the *other* side of a partial hypothesis (spec §4.5).

use crate::lm::dfa::DfaState;
use crate::lm::ngram::WordId;

#[derive(Debug, Clone)]
pub struct WordEnd {
    pub word_id: WordId,
    pub entry_idx: usize,
    pub frame: usize,
    /// Cumulative score through this word end under pass 1's approximate
    /// (bigram/unigram) LM, used for pruning and as the A* heuristic basis.
    pub score: f32,
    /// This word's acoustic-only contribution (excludes any LM term),
    /// isolated so pass 2 can replace pass 1's approximate LM score with an
    /// exact higher-order one without re-running acoustic search.
    pub acoustic_only: f32,
    pub prev: Option<usize>,
    /// DFA grammar state reached by completing this word, `None` under an
    /// N-gram LM. Pass 2 requires an accepting state here before it will
    /// report a hypothesis ending on this word as complete.
    pub dfa_state: Option<DfaState>,
}

#[derive(Debug, Clone, Default)]
pub struct BackTrellis {
    pub entries: Vec<WordEnd>,
    by_frame: Vec<Vec<usize>>,
    /// Best total score of any surviving pass-1 token at each frame,
    /// independent of whether a word boundary fell there.
    frame_best_score: Vec<f32>,
}

impl BackTrellis {
    pub fn new(num_frames: usize) -> Self {
        Self {
            entries: Vec::new(),
            by_frame: vec![Vec::new(); num_frames],
            frame_best_score: vec![crate::error::LOG_ZERO; num_frames],
        }
    }

    pub fn push(&mut self, word_end: WordEnd) -> usize {
        let frame = word_end.frame;
        let idx = self.entries.len();
        self.entries.push(word_end);
        if frame < self.by_frame.len() {
            self.by_frame[frame].push(idx);
        }
        idx
    }

    pub fn record_frame_best(&mut self, frame: usize, score: f32) {
        if let Some(slot) = self.frame_best_score.get_mut(frame) {
            if score > *slot {
                *slot = score;
            }
        }
    }

    pub fn words_ending_at(&self, frame: usize) -> &[usize] {
        self.by_frame.get(frame).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry(&self, idx: usize) -> &WordEnd {
        &self.entries[idx]
    }

    /// Every word-end record whose frame falls within `[start, end]`,
    /// inclusive — the "word-presence window" pass 2 queries when deciding
    /// which words could plausibly span a gap (spec §8).
    pub fn words_in_window(&self, start: usize, end: usize) -> Vec<usize> {
        let end = end.min(self.by_frame.len().saturating_sub(1));
        if start > end {
            return Vec::new();
        }
        self.by_frame[start..=end].iter().flatten().copied().collect()
    }

    /// The pass-1 best survivor score at `frame`, used as the admissible
    /// estimate of the unscored remainder of an utterance during stack
    /// decoding.
    pub fn best_score_at(&self, frame: usize) -> f32 {
        self.frame_best_score
            .get(frame)
            .copied()
            .unwrap_or(crate::error::LOG_ZERO)
    }

    pub fn num_frames(&self) -> usize {
        self.by_frame.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_query_returns_only_in_range_entries() {
        let mut trellis = BackTrellis::new(10);
        trellis.push(WordEnd {
            word_id: 0,
            entry_idx: 0,
            frame: 2,
            score: -1.0,
            acoustic_only: -1.0,
            prev: None,
            dfa_state: None,
        });
        trellis.push(WordEnd {
            word_id: 1,
            entry_idx: 1,
            frame: 7,
            score: -2.0,
            acoustic_only: -1.0,
            prev: Some(0),
            dfa_state: None,
        });
        assert_eq!(trellis.words_in_window(0, 3).len(), 1);
        assert_eq!(trellis.words_in_window(0, 7).len(), 2);
        assert_eq!(trellis.words_in_window(3, 6).len(), 0);
    }

    #[test]
    fn frame_best_tracks_max() {
        let mut trellis = BackTrellis::new(5);
        trellis.record_frame_best(1, -5.0);
        trellis.record_frame_best(1, -2.0);
        trellis.record_frame_best(1, -9.0);
        assert_eq!(trellis.best_score_at(1), -2.0);
    }
}
