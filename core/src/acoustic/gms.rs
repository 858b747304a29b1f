//! Gaussian Mixture Selection: a coarse-to-fine pruning stage run before
//! per-component scoring, grounded on
//! `original_source/libsent/src/phmm/gms.c`.
//!
//! A small coarse codebook (one representative density per fine-grained
//! cluster) is scored first; only the clusters whose representative scores
//! well are expanded into their full member densities for exact scoring.
//! This trades a second, cheaper scoring pass for skipping the bulk of a
//! large codebook outright, on top of (not instead of) the per-mixture
//! [`crate::config::PruneMode`] pruning in `am::state`.

use crate::am::gaussian::GaussianDensity;
use crate::feature::FeatureFrame;
use ordered_float::OrderedFloat;

/// One coarse cluster: a representative density and the fine-codebook
/// component indices it stands in for.
#[derive(Debug, Clone)]
pub struct GmsCluster {
    pub representative: GaussianDensity,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct GmsTable {
    pub clusters: Vec<GmsCluster>,
}

impl GmsTable {
    /// Builds a coarse table by clustering `fine`'s components into groups
    /// of `cluster_size`, each represented by the mean of its members. A
    /// simple contiguous grouping rather than k-means: GMS only needs a
    /// coarse ranking, not a tight codebook.
    pub fn build(fine: &[GaussianDensity], cluster_size: usize) -> Self {
        let cluster_size = cluster_size.max(1);
        let clusters = fine
            .chunks(cluster_size)
            .enumerate()
            .filter_map(|(chunk_idx, chunk)| {
                let dim = chunk.first()?.dim();
                let mut mean = vec![0.0f32; dim];
                let mut var = vec![0.0f32; dim];
                for d in chunk {
                    for i in 0..dim {
                        mean[i] += d.mean[i];
                    }
                }
                for v in mean.iter_mut() {
                    *v /= chunk.len() as f32;
                }
                for d in chunk {
                    for i in 0..dim {
                        var[i] += d.var[i] + (d.mean[i] - mean[i]).powi(2);
                    }
                }
                for v in var.iter_mut() {
                    *v = (*v / chunk.len() as f32).max(1e-6);
                }
                let representative = GaussianDensity::new(mean, var).ok()?;
                let base = chunk_idx * cluster_size;
                let members = (base..base + chunk.len()).collect();
                Some(GmsCluster {
                    representative,
                    members,
                })
            })
            .collect();
        Self { clusters }
    }

    /// Returns the fine-codebook component indices belonging to the
    /// `top_clusters` best-scoring clusters against `frame`.
    pub fn select(&self, frame: &FeatureFrame, top_clusters: usize) -> Vec<usize> {
        if self.clusters.is_empty() {
            return Vec::new();
        }
        let mut ranked: Vec<(usize, f32)> = self
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.representative.log_density(frame)))
            .collect();
        ranked.sort_unstable_by_key(|&(_, score)| std::cmp::Reverse(OrderedFloat(score)));
        ranked
            .into_iter()
            .take(top_clusters.max(1))
            .flat_map(|(i, _)| self.clusters[i].members.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_cluster_nearest_the_frame() {
        let components = vec![
            GaussianDensity::new(vec![0.0], vec![1.0]).unwrap(),
            GaussianDensity::new(vec![0.1], vec![1.0]).unwrap(),
            GaussianDensity::new(vec![10.0], vec![1.0]).unwrap(),
            GaussianDensity::new(vec![10.1], vec![1.0]).unwrap(),
        ];
        let table = GmsTable::build(&components, 2);
        let frame = FeatureFrame::new(vec![10.05]);
        let selected = table.select(&frame, 1);
        assert_eq!(selected, vec![2, 3]);
    }
}
