//! Error and status types.
//!
//! `DecoderError` covers fatal conditions (configuration, model-build
//! failures) that abort construction. `Status` covers per-utterance
//! conditions that are recovered locally and reported on the result rather
//! than propagated as an `Err` — see spec §7.

use thiserror::Error;

/// Floor log-probability used throughout the crate for "arc absent" /
/// "impossible but not fatal".
pub const LOG_ZERO: f32 = -1.0e10;

/// Sentinel strictly below [`LOG_ZERO`], used to mark unset cache entries so
/// they are distinguishable from a computed (and possibly very bad) score.
pub const CACHE_UNSET: f32 = -2.0e10;

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unresolved logical HMM name: {0}")]
    UnresolvedLogicalHmm(String),

    #[error("invalid acoustic model: {0}")]
    InvalidAcousticModel(String),

    #[error("invalid language model: {0}")]
    InvalidLanguageModel(String),

    #[error("lexicon tree build failed: {0}")]
    WchmmBuild(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("serialization error")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, DecoderError>;

/// Per-utterance outcome status. `Ok` is the only non-terminal variant;
/// every other variant means pass 2 (and in some cases pass 1) did not run
/// to completion, but the recognizer instance itself remains usable for the
/// next utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    SearchFailed,
    RejectPower,
    RejectShort,
    RejectLong,
    RejectGmm,
    OnlySilence,
    Terminate,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}
