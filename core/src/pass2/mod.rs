//! Pass 2: best-first stack decoding, MBR rescoring, and lattice/confusion
//! network construction over pass 1's back-trellis.

pub mod lattice;
pub mod mbr;
pub mod stack;

pub use lattice::{ConfusionNetwork, Lattice};
pub use stack::{Hypothesis, StackDecoder};
