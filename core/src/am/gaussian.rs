//! Diagonal-covariance Gaussian densities and codebooks.

use crate::error::{DecoderError, Result};
use crate::feature::FeatureFrame;
use serde::{Deserialize, Serialize};

/// A single diagonal Gaussian component. `gconst` is the precomputed
/// `-0.5 * (dim * ln(2*pi) + sum(ln(var)))` term so that scoring a frame is
/// a single multiply-accumulate loop (spec §4.1 `outprob`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianDensity {
    pub mean: Vec<f32>,
    pub var: Vec<f32>,
    pub gconst: f32,
}

impl GaussianDensity {
    pub fn new(mean: Vec<f32>, var: Vec<f32>) -> Result<Self> {
        if mean.len() != var.len() {
            return Err(DecoderError::InvalidAcousticModel(format!(
                "mean/var dimension mismatch: {} vs {}",
                mean.len(),
                var.len()
            )));
        }
        if var.iter().any(|v| *v <= 0.0) {
            return Err(DecoderError::InvalidAcousticModel(
                "non-positive variance in Gaussian density".into(),
            ));
        }
        let dim = mean.len() as f32;
        let sum_ln_var: f32 = var.iter().map(|v| v.ln()).sum();
        let gconst = -0.5 * (dim * (2.0 * std::f32::consts::PI).ln() + sum_ln_var);
        Ok(Self { mean, var, gconst })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Log density of `frame` under this component, skipping dimensions the
    /// frame marks absent (MSD streams).
    pub fn log_density(&self, frame: &FeatureFrame) -> f32 {
        let mut acc = self.gconst;
        for i in 0..self.mean.len().min(frame.dim()) {
            if !frame.is_present(i) {
                continue;
            }
            let d = frame.values[i] - self.mean[i];
            acc -= 0.5 * d * d / self.var[i];
        }
        acc
    }
}

/// A shared pool of Gaussian components indexed by codebook, used by
/// tied-mixture models where many states reuse the same component set
/// (spec §4.1 `calc_tied_mix`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Codebook {
    pub id: usize,
    pub densities: Vec<GaussianDensity>,
}

impl Codebook {
    pub fn new(id: usize, densities: Vec<GaussianDensity>) -> Self {
        Self { id, densities }
    }

    pub fn len(&self) -> usize {
        self.densities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.densities.is_empty()
    }
}
