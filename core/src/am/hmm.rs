//! Physical and logical HMM definitions, and phone-name parsing.
//!
//! Terminology follows spec §3/§4.1: a *physical* HMM is a trained model
//! with real Gaussian mixtures; a *logical* HMM is the name the lexicon and
//! WCHMM actually reference (typically a triphone). When training data
//! lacked enough examples of a triphone, its logical name falls back to a
//! *pseudo* HMM: a per-state pool of physical states drawn from whichever
//! biphones/monophones share that context, combined at scoring time with
//! [`crate::am::state::combine_cd_scores`].

use crate::am::state::State;
use crate::error::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed logical HMM name: `"L-C+R"`, `"L-C"`, `"C+R"`, or plain `"C"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneContext {
    Triphone {
        left: String,
        center: String,
        right: String,
    },
    LeftBiphone { left: String, center: String },
    RightBiphone { center: String, right: String },
    Monophone(String),
}

impl PhoneContext {
    pub fn center(&self) -> &str {
        match self {
            PhoneContext::Triphone { center, .. } => center,
            PhoneContext::LeftBiphone { center, .. } => center,
            PhoneContext::RightBiphone { center, .. } => center,
            PhoneContext::Monophone(c) => c,
        }
    }

    /// The monophone and both biphone contexts that could supply pooled
    /// states for this name if it is itself unseen (used when building
    /// pseudo phones for an unseen *triphone*; biphones/monophones fall
    /// back only to the monophone).
    pub fn backoff_contexts(&self) -> Vec<PhoneContext> {
        match self {
            PhoneContext::Triphone { left, center, right } => vec![
                PhoneContext::LeftBiphone {
                    left: left.clone(),
                    center: center.clone(),
                },
                PhoneContext::RightBiphone {
                    center: center.clone(),
                    right: right.clone(),
                },
                PhoneContext::Monophone(center.clone()),
            ],
            PhoneContext::LeftBiphone { center, .. } | PhoneContext::RightBiphone { center, .. } => {
                vec![PhoneContext::Monophone(center.clone())]
            }
            PhoneContext::Monophone(_) => vec![],
        }
    }
}

/// Parses a logical HMM name in Julius-style `L-C+R` / `L-C` / `C+R` / `C`
/// notation (spec §4.1, grounded on `original_source/libsent/src/hmminfo/*`).
pub fn parse_phone_name(name: &str) -> Result<PhoneContext> {
    let has_left = name.contains('-');
    let has_right = name.contains('+');
    match (has_left, has_right) {
        (true, true) => {
            let (left, rest) = name
                .split_once('-')
                .ok_or_else(|| DecoderError::InvalidAcousticModel(format!("malformed phone name: {name}")))?;
            let (center, right) = rest
                .split_once('+')
                .ok_or_else(|| DecoderError::InvalidAcousticModel(format!("malformed phone name: {name}")))?;
            Ok(PhoneContext::Triphone {
                left: left.to_string(),
                center: center.to_string(),
                right: right.to_string(),
            })
        }
        (true, false) => {
            let (left, center) = name
                .split_once('-')
                .ok_or_else(|| DecoderError::InvalidAcousticModel(format!("malformed phone name: {name}")))?;
            Ok(PhoneContext::LeftBiphone {
                left: left.to_string(),
                center: center.to_string(),
            })
        }
        (false, true) => {
            let (center, right) = name
                .split_once('+')
                .ok_or_else(|| DecoderError::InvalidAcousticModel(format!("malformed phone name: {name}")))?;
            Ok(PhoneContext::RightBiphone {
                center: center.to_string(),
                right: right.to_string(),
            })
        }
        (false, false) => Ok(PhoneContext::Monophone(name.to_string())),
    }
}

/// A trained physical HMM: fixed-topology left-to-right (Bakis) model with
/// `states_per_phone` emitting states, a self-loop and forward transition
/// per state, and an optional direct init-to-final skip arc used to model
/// multi-path short-pause words (spec §3 "multi-path" invariant; scope
/// decision recorded in DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalHmm {
    pub name: String,
    pub states: Vec<State>,
    pub self_loop_logprob: Vec<f32>,
    pub forward_logprob: Vec<f32>,
    pub skip_logprob: Option<f32>,
}

impl PhysicalHmm {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn has_skip_arc(&self) -> bool {
        self.skip_logprob.is_some()
    }
}

/// How a logical HMM name resolves to scoreable state material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogicalResolution {
    /// Trained directly: score against this physical HMM's states.
    Defined { physical: String },
    /// Unseen context: each emitting-state slot pools the listed
    /// `(physical name, state index)` members and combines their scores.
    Pseudo { state_members: Vec<Vec<(String, usize)>> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalHmm {
    pub name: String,
    pub context: PhoneContext,
    pub resolution: LogicalResolution,
}

/// The full acoustic model's HMM tables: physical HMMs keyed by name, and
/// every logical name the lexicon can reference, pre-resolved to either a
/// defined physical HMM or a pseudo state pool.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HmmSet {
    pub physical: HashMap<String, PhysicalHmm>,
    pub logical: HashMap<String, LogicalHmm>,
}

impl HmmSet {
    pub fn lookup_logical(&self, name: &str) -> Option<&LogicalHmm> {
        self.logical.get(name)
    }

    pub fn lookup_physical(&self, name: &str) -> Option<&PhysicalHmm> {
        self.physical.get(name)
    }
}
