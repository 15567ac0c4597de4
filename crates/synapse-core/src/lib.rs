//! Core data model and learning rules for adaptive routing bias

mod bias;
mod clock;
mod config;
mod feedback;
mod plasticity;
mod types;

pub use clock::SlotClock;
pub use config::{
    BiasRange, CategorizerConfig, Config, ConfigError, DecayConfig, FeedbackConfig,
    PlasticityConfig, PredictionConfig, WorkerProfiles,
};
pub use feedback::{elapsed_secs, Feedback, FeedbackInferencer};
pub use types::{
    fingerprint, is_unknown, AccuracyReport, FeedbackSource, InteractionTrace, NewTrace,
    PathwayState, PathwayStats, PatternType, Prediction, PredictionCandidate, SynapticPathway,
    TemporalPattern, UNKNOWN_CATEGORY,
};
