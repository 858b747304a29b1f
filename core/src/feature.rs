//! Observation vectors consumed by the acoustic likelihood engine.

/// A single analysis frame, e.g. MFCC + delta + delta-delta coefficients.
///
/// `present` tracks Multi-Stream/MSD dimensions that were dropped upstream
/// (e.g. voicing-dependent F0 features on an unvoiced frame); missing
/// dimensions are skipped rather than scored against, per spec §4.1.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub values: Vec<f32>,
    pub present: Vec<bool>,
}

impl FeatureFrame {
    pub fn new(values: Vec<f32>) -> Self {
        let present = vec![true; values.len()];
        Self { values, present }
    }

    pub fn with_missing(values: Vec<f32>, present: Vec<bool>) -> Self {
        debug_assert_eq!(values.len(), present.len());
        Self { values, present }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn is_present(&self, i: usize) -> bool {
        self.present.get(i).copied().unwrap_or(false)
    }
}

/// A full utterance: an ordered sequence of frames plus an optional
/// precomputed short-term power trajectory used for input rejection
/// (spec §8 scenario 6).
#[derive(Debug, Clone, Default)]
pub struct Utterance {
    pub frames: Vec<FeatureFrame>,
    pub power: Vec<f32>,
}

impl Utterance {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn mean_power(&self) -> Option<f32> {
        if self.power.is_empty() {
            return None;
        }
        Some(self.power.iter().sum::<f32>() / self.power.len() as f32)
    }
}
