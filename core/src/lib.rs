//! Two-pass Viterbi search core for a large-vocabulary continuous speech
//! recognizer.
//!
//! An utterance is decoded in two passes (spec §OVERVIEW): pass 1 is a
//! frame-synchronous beam search over a shared-prefix lexicon tree
//! ([`wchmm`]) using an approximate (bigram/unigram) language model,
//! producing a sparse [`trellis::BackTrellis`] of word-boundary
//! hypotheses; pass 2 ([`pass2`]) rescores those boundaries with the full
//! language model via best-first stack decoding, yielding an n-best list,
//! word lattice, and confusion network. [`recognizer::Recognizer`] drives
//! both passes for a caller.
//!
//! File-format loaders (HTK, ARPA, Julius binary formats), audio capture,
//! and the module-server protocol are out of scope here; callers construct
//! an [`am::AcousticModel`], [`lm::LanguageModel`], and
//! [`lexicon::Dictionary`] directly or via their own loaders.

pub mod acoustic;
pub mod am;
pub mod config;
pub mod error;
pub mod feature;
pub mod lexicon;
pub mod lm;
pub mod pass1;
pub mod pass2;
pub mod recognizer;
pub mod result;
pub mod trellis;
pub mod wchmm;

pub use config::RecognizerConfig;
pub use error::{DecoderError, Result, Status};
pub use feature::{FeatureFrame, Utterance};
pub use recognizer::{NullCallbacks, Recognizer, RecognizerCallbacks, RecognitionOutcome};
