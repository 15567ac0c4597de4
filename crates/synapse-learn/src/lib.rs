//! Online learning for routing bias and next-request prediction

mod categorizer;
mod embed;
mod miner;
mod plasticity;
mod predictor;
mod prewarm;
mod pruner;
mod synapse;

#[cfg(test)]
mod testing;

pub use categorizer::QueryCategorizer;
#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;
pub use embed::{EmbedError, Embedder, UnavailableEmbedder};
pub use miner::TemporalPatternMiner;
pub use plasticity::PlasticityEngine;
pub use predictor::{LensMatches, Predictor};
pub use prewarm::{ContextError, ContextSource, PrewarmCache};
pub use pruner::Pruner;
pub use synapse::{Interaction, RecordOutcome, ResolvedFeedback, Synapse};
