//! Per-frame output-probability cache.
//!
//! The same logical HMM state is reached by many tree paths within one
//! frame (shared prefixes, pseudo-phone pooling); caching by `(logical
//! name, state index)` for the current frame only guarantees the "same
//! state, same frame, same score" invariant (spec §8) without growing
//! unboundedly across an utterance.
//!
//! A second cache keyed on `(frame, codebook_id)` holds the raw per-component
//! log-densities for tied-mixture codebooks: every state sharing a codebook
//! would otherwise redo the same Gaussian evaluations within a frame.

use ahash::AHashMap;

#[derive(Debug, Default)]
pub struct FrameCache {
    frame_idx: Option<usize>,
    scores: AHashMap<(String, usize), f32>,
    codebook_densities: AHashMap<usize, Vec<f32>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all entries if `frame_idx` has advanced since the last call.
    pub fn begin_frame(&mut self, frame_idx: usize) {
        if self.frame_idx != Some(frame_idx) {
            self.scores.clear();
            self.codebook_densities.clear();
            self.frame_idx = Some(frame_idx);
        }
    }

    pub fn get(&self, logical_name: &str, state_idx: usize) -> Option<f32> {
        self.scores.get(&(logical_name.to_string(), state_idx)).copied()
    }

    pub fn insert(&mut self, logical_name: &str, state_idx: usize, score: f32) {
        self.scores.insert((logical_name.to_string(), state_idx), score);
    }

    pub fn get_codebook(&self, codebook_id: usize) -> Option<&[f32]> {
        self.codebook_densities.get(&codebook_id).map(Vec::as_slice)
    }

    pub fn insert_codebook(&mut self, codebook_id: usize, densities: Vec<f32>) {
        self.codebook_densities.insert(codebook_id, densities);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_on_new_frame() {
        let mut cache = FrameCache::new();
        cache.begin_frame(0);
        cache.insert("a", 0, -1.0);
        assert_eq!(cache.get("a", 0), Some(-1.0));
        cache.begin_frame(1);
        assert_eq!(cache.get("a", 0), None);
    }

    #[test]
    fn same_frame_reuses_entries() {
        let mut cache = FrameCache::new();
        cache.begin_frame(5);
        cache.insert("x", 1, -2.0);
        cache.begin_frame(5);
        assert_eq!(cache.get("x", 1), Some(-2.0));
    }

    #[test]
    fn codebook_densities_clear_on_new_frame() {
        let mut cache = FrameCache::new();
        cache.begin_frame(0);
        cache.insert_codebook(3, vec![-1.0, -2.0]);
        assert_eq!(cache.get_codebook(3), Some(&[-1.0, -2.0][..]));
        cache.begin_frame(1);
        assert_eq!(cache.get_codebook(3), None);
    }
}
