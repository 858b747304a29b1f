//! The acoustic likelihood engine: wires the trained [`AcousticModel`]
//! together with a per-frame cache so pass 1 and pass 2 share identical,
//! deterministic output probabilities (spec §8 "deterministic outprob").
//!
//! Per-mixture pruning (`PruneMode`) and tied-mixture codebook lookups live
//! in [`crate::am::state`] since they are properties of a single mixture
//! evaluation; this module adds the coarser, cross-mixture
//! [`gms`] selection stage and the cache that makes repeated lookups within
//! a frame free.

pub mod cache;
pub mod gms;

use crate::am::AcousticModel;
use crate::config::RecognizerConfig;
use crate::feature::FeatureFrame;
use cache::FrameCache;

pub struct LikelihoodEngine<'a> {
    model: &'a AcousticModel,
    cfg: &'a RecognizerConfig,
    cache: FrameCache,
}

impl<'a> LikelihoodEngine<'a> {
    pub fn new(model: &'a AcousticModel, cfg: &'a RecognizerConfig) -> Self {
        Self {
            model,
            cfg,
            cache: FrameCache::new(),
        }
    }

    pub fn begin_frame(&mut self, frame_idx: usize) {
        self.cache.begin_frame(frame_idx);
    }

    /// Output log-probability of `logical_name`'s `state_idx`-th emitting
    /// state against the current frame, memoized for the duration of the
    /// current [`Self::begin_frame`] window. When the state resolves to a
    /// tied-mixture codebook, the component densities are computed once per
    /// `(frame, codebook)` and reused across every other state sharing that
    /// codebook this frame.
    pub fn output_prob(&mut self, logical_name: &str, state_idx: usize, frame: &FeatureFrame) -> f32 {
        if let Some(cached) = self.cache.get(logical_name, state_idx) {
            return cached;
        }

        let codebook_id = self.model.tied_codebook_of(logical_name, state_idx);
        if let Some(codebook_id) = codebook_id {
            if self.cache.get_codebook(codebook_id).is_none() {
                if let Some(codebook) = self.model.codebooks.get(codebook_id) {
                    let densities: Vec<f32> = codebook
                        .densities
                        .iter()
                        .map(|d| d.log_density(frame))
                        .collect();
                    self.cache.insert_codebook(codebook_id, densities);
                }
            }
        }
        let precomputed = codebook_id.and_then(|id| self.cache.get_codebook(id));

        let score = self.model.output_prob(
            logical_name,
            state_idx,
            frame,
            self.cfg.prune_mode,
            self.cfg.gaussian_top_n,
            self.cfg.gaussian_beam_slack,
            self.cfg.cd_combiner,
            self.cfg.gms_top_m,
            precomputed,
        );
        self.cache.insert(logical_name, state_idx, score);
        score
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::am::gaussian::GaussianDensity;
    use crate::am::hmm::{HmmSet, LogicalHmm, LogicalResolution, PhoneContext, PhysicalHmm};
    use crate::am::state::{MixturePdf, State};
    use std::collections::HashMap;

    fn toy_model() -> AcousticModel {
        let density = GaussianDensity::new(vec![0.0], vec![1.0]).unwrap();
        let pdf = MixturePdf::Owned {
            densities: vec![density],
            log_weights: vec![0.0],
        };
        let physical = PhysicalHmm {
            name: "a".into(),
            states: vec![State::new(pdf)],
            self_loop_logprob: vec![-0.1],
            forward_logprob: vec![-2.3],
            skip_logprob: None,
        };
        let mut physical_map = HashMap::new();
        physical_map.insert("a".to_string(), physical);
        let mut logical_map = HashMap::new();
        logical_map.insert(
            "a".to_string(),
            LogicalHmm {
                name: "a".into(),
                context: PhoneContext::Monophone("a".into()),
                resolution: LogicalResolution::Defined { physical: "a".into() },
            },
        );
        AcousticModel {
            hmm: HmmSet {
                physical: physical_map,
                logical: logical_map,
            },
            codebooks: vec![],
            states_per_phone: 1,
            gms_tables: vec![],
        }
    }

    #[test]
    fn repeated_lookup_in_same_frame_is_cached() {
        let model = toy_model();
        let cfg = RecognizerConfig::default();
        let mut engine = LikelihoodEngine::new(&model, &cfg);
        engine.begin_frame(0);
        let frame = FeatureFrame::new(vec![0.0]);
        let first = engine.output_prob("a", 0, &frame);
        assert_eq!(engine.cache_len(), 1);
        let second = engine.output_prob("a", 0, &frame);
        assert_eq!(first, second);
        assert_eq!(engine.cache_len(), 1);
    }
}
