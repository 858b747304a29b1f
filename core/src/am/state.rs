//! Mixture PDFs and HMM states.

use crate::acoustic::gms::GmsTable;
use crate::am::gaussian::{Codebook, GaussianDensity};
use crate::config::{CdCombiner, PruneMode};
use crate::error::LOG_ZERO;
use crate::feature::FeatureFrame;
use serde::{Deserialize, Serialize};

/// A weighted mixture of Gaussian components, either owning its densities
/// directly or referring into a shared [`Codebook`] (tied mixture).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MixturePdf {
    Owned {
        densities: Vec<GaussianDensity>,
        log_weights: Vec<f32>,
    },
    Tied {
        codebook_id: usize,
        log_weights: Vec<f32>,
    },
}

impl MixturePdf {
    /// Log output probability of `frame`, applying `prune_mode` to skip
    /// components unlikely to matter once the top components are known.
    ///
    /// `codebooks` resolves `Tied` mixtures; pass an empty slice for models
    /// with no tied mixtures. `gms_tables` is index-aligned with
    /// `codebooks`; when `gms_top_m` is set and a tied mixture's codebook
    /// has a table, GMS coarse-to-fine selection narrows the candidate
    /// components before the per-mixture `prune_mode` pass runs on what's
    /// left (spec §4.1). `precomputed_densities`, when given and the right
    /// length, replaces recomputing each component's raw log-density —
    /// the caller's tied-mixture frame cache (spec §4.1 "tied-mixture
    /// cache"), since every state sharing a codebook would otherwise
    /// redo the same Gaussian evaluations.
    pub fn log_prob(
        &self,
        frame: &FeatureFrame,
        codebooks: &[Codebook],
        gms_tables: &[GmsTable],
        prune_mode: PruneMode,
        top_n: usize,
        beam_slack: f32,
        gms_top_m: Option<usize>,
        precomputed_densities: Option<&[f32]>,
    ) -> f32 {
        let (raw, weights): (Vec<f32>, &[f32]) = match self {
            MixturePdf::Owned {
                densities,
                log_weights,
            } => (
                densities.iter().map(|d| d.log_density(frame)).collect(),
                log_weights.as_slice(),
            ),
            MixturePdf::Tied {
                codebook_id,
                log_weights,
            } => {
                let Some(cb) = codebooks.get(*codebook_id) else {
                    return LOG_ZERO;
                };
                let raw: Vec<f32> = match precomputed_densities {
                    Some(scores) if scores.len() == cb.densities.len() => scores.to_vec(),
                    _ => cb.densities.iter().map(|d| d.log_density(frame)).collect(),
                };
                match gms_top_m.zip(gms_tables.get(*codebook_id)) {
                    Some((top_m, table)) if !table.clusters.is_empty() => {
                        let selected = table.select(frame, top_m);
                        let sel_raw = selected.iter().filter_map(|&i| raw.get(i).copied()).collect();
                        let sel_w: Vec<f32> = selected
                            .iter()
                            .filter_map(|&i| log_weights.get(i).copied())
                            .collect();
                        return Self::finish(sel_raw, &sel_w, prune_mode, top_n, beam_slack);
                    }
                    _ => (raw, log_weights.as_slice()),
                }
            }
        };
        Self::finish(raw, weights, prune_mode, top_n, beam_slack)
    }

    fn finish(raw: Vec<f32>, weights: &[f32], prune_mode: PruneMode, top_n: usize, beam_slack: f32) -> f32 {
        if raw.is_empty() {
            return LOG_ZERO;
        }
        let mut component_scores: Vec<f32> = raw.iter().zip(weights.iter()).map(|(d, w)| w + d).collect();

        match prune_mode {
            PruneMode::None => {}
            PruneMode::Safe | PruneMode::Heuristic | PruneMode::Beam => {
                prune_components(&mut component_scores, prune_mode, top_n, beam_slack);
            }
        }

        log_sum_exp(&component_scores)
    }
}

/// Zeroes out (sets to [`LOG_ZERO`]) components that pruning excludes,
/// leaving the vector the same length so `log_sum_exp` stays a flat fold.
fn prune_components(scores: &mut [f32], mode: PruneMode, top_n: usize, beam_slack: f32) {
    if scores.len() <= top_n {
        return;
    }
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    match mode {
        PruneMode::Beam => {
            for s in scores.iter_mut() {
                if max - *s > beam_slack {
                    *s = LOG_ZERO;
                }
            }
        }
        PruneMode::Heuristic => {
            // Strict top-n: fast, no safety margin near the cutoff.
            let mut idx: Vec<usize> = (0..scores.len()).collect();
            idx.sort_unstable_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap());
            for &i in idx.iter().skip(top_n) {
                scores[i] = LOG_ZERO;
            }
        }
        PruneMode::Safe => {
            // Top-n widened by beam_slack around the cutoff score so a
            // component that's a close runner-up for the n-th slot isn't
            // silently dropped.
            let mut idx: Vec<usize> = (0..scores.len()).collect();
            idx.sort_unstable_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap());
            let cutoff = scores[idx[top_n.saturating_sub(1).min(idx.len() - 1)]];
            for &i in &idx {
                if scores[i] < cutoff - beam_slack {
                    scores[i] = LOG_ZERO;
                }
            }
        }
        PruneMode::None => {}
    }
}

/// Numerically stable log(sum(exp(x))).
pub fn log_sum_exp(scores: &[f32]) -> f32 {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return LOG_ZERO;
    }
    let sum: f32 = scores.iter().map(|s| (s - max).exp()).sum();
    max + sum.ln()
}

/// Combines a pseudo-phone's per-member state scores into one score
/// (spec §4.1 `outprob_cd`).
pub fn combine_cd_scores(scores: &[f32], combiner: CdCombiner) -> f32 {
    if scores.is_empty() {
        return LOG_ZERO;
    }
    match combiner {
        CdCombiner::Average => scores.iter().sum::<f32>() / scores.len() as f32,
        CdCombiner::Max => scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
        CdCombiner::TopKMean(k) => {
            let mut sorted = scores.to_vec();
            sorted.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap());
            let k = k.min(sorted.len()).max(1);
            sorted[..k].iter().sum::<f32>() / k as f32
        }
    }
}

/// One emitting HMM state: a single mixture PDF plus a stable identity used
/// by the back-trellis and forced alignment to reference "this state at
/// this frame" without re-deriving it from the WCHMM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub pdf: MixturePdf,
}

impl State {
    pub fn new(pdf: MixturePdf) -> Self {
        Self { pdf }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::am::gaussian::GaussianDensity;

    fn codebook(means: &[f32]) -> Codebook {
        let densities = means
            .iter()
            .map(|&m| GaussianDensity::new(vec![m], vec![1.0]).unwrap())
            .collect();
        Codebook::new(0, densities)
    }

    #[test]
    fn gms_selection_narrows_to_the_frame_nearby_cluster() {
        let codebooks = vec![codebook(&[0.0, 0.1, 10.0, 10.1])];
        let gms_tables = vec![GmsTable::build(&codebooks[0].densities, 2)];
        let pdf = MixturePdf::Tied {
            codebook_id: 0,
            log_weights: vec![0.0, 0.0, 0.0, 0.0],
        };
        let frame = FeatureFrame::new(vec![10.05]);
        let with_gms = pdf.log_prob(
            &frame,
            &codebooks,
            &gms_tables,
            PruneMode::None,
            8,
            5.0,
            Some(1),
            None,
        );
        let without_gms = pdf.log_prob(&frame, &codebooks, &gms_tables, PruneMode::None, 8, 5.0, None, None);
        // GMS only scores the two components near 10.0, so its total mass
        // (and hence log-sum-exp) is lower than scoring all four components.
        assert!(with_gms < without_gms);
    }

    #[test]
    fn precomputed_densities_are_used_instead_of_recomputing() {
        let codebooks = vec![codebook(&[0.0])];
        let pdf = MixturePdf::Tied {
            codebook_id: 0,
            log_weights: vec![0.0],
        };
        let frame = FeatureFrame::new(vec![0.0]);
        // A precomputed density wildly different from the real one should
        // win over recomputation, proving it's actually consulted.
        let forced = vec![-1000.0];
        let score = pdf.log_prob(&frame, &codebooks, &[], PruneMode::None, 8, 5.0, None, Some(&forced));
        assert!(score < -900.0);
    }

    #[test]
    fn prune_mode_safe_keeps_a_close_runner_up_that_heuristic_drops() {
        let mut scores = vec![0.0, -0.1, -10.0];
        prune_components(&mut scores, PruneMode::Heuristic, 1, 5.0);
        assert_eq!(scores[1], LOG_ZERO);

        let mut scores = vec![0.0, -0.1, -10.0];
        prune_components(&mut scores, PruneMode::Safe, 1, 5.0);
        assert!(scores[1] > LOG_ZERO);
        assert_eq!(scores[2], LOG_ZERO);
    }
}
