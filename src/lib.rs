//! Linear-chain structured-perceptron tagging core.
//!
//! Given per-position unary potentials and a shared binary transition matrix,
//! [`ViterbiDecoder`] finds the maximum-scoring tag path per sequence by
//! dynamic programming, [`path_score`] rescoring any fixed path exactly.
//! [`StructuredPerceptron`] turns predicted-vs-gold score margins into a
//! hinge loss (and explicit gradients) for an external optimizer, and
//! [`ChainTagger`] drives the whole thing over padded, masked batches.
//!
//! Producing the unary potentials (embedder, encoder) and running the
//! optimizer are the caller's business; the transition matrix is the only
//! learned parameter this crate knows about, and even that is just borrowed
//! during a pass.

pub mod batch;
pub mod chain;
pub mod error;
pub mod evaluation;
pub mod tagger;
pub mod vocab;

pub use batch::{
    AugmentedTransitions, Float, SeqPotentials, TransitionMatrix, UnaryPotentials, FORBIDDEN,
};
pub use chain::perceptron::{LossReduction, StructuredPerceptron};
pub use chain::score::path_score;
pub use chain::viterbi::ViterbiDecoder;
pub use error::{Error, Result};
pub use evaluation::Accuracy;
pub use tagger::{ChainTagger, TaggerOutput};
pub use vocab::TagVocab;
