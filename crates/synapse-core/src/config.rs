//! Configuration for plasticity, prediction and categorization

use crate::clock::SlotClock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Worker id -> exemplar phrases describing what the worker handles
pub type WorkerProfiles = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Bounded reinforcement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlasticityConfig {
    pub strengthen_rate: f64,
    /// Larger than `strengthen_rate`: failures are remembered harder
    pub weaken_rate: f64,
    pub min_strength: f64,
    pub max_strength: f64,
    pub default_strength: f64,
}

impl Default for PlasticityConfig {
    fn default() -> Self {
        Self {
            strengthen_rate: 0.08,
            weaken_rate: 0.12,
            min_strength: 0.05,
            max_strength: 0.95,
            default_strength: 0.5,
        }
    }
}

/// Caller-facing multiplier range a pathway strength is projected onto
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasRange {
    pub min: f64,
    pub max: f64,
}

impl Default for BiasRange {
    fn default() -> Self {
        Self {
            min: 0.715,
            max: 0.985,
        }
    }
}

/// Timing thresholds for implicit feedback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub fast_follow_up_secs: f64,
    pub long_silence_secs: f64,
    /// Used when the previous timestamp cannot be parsed
    pub default_elapsed_secs: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            fast_follow_up_secs: 30.0,
            long_silence_secs: 300.0,
            default_elapsed_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub hourly_weight: f64,
    pub daily_weight: f64,
    pub sequential_weight: f64,
    /// External rows are folded in at this weight
    pub external_weight: f64,
    pub prewarm_threshold: f64,
    pub min_samples: u64,
    /// How many top candidates get a persisted prediction row
    pub max_recorded: usize,
    pub external_initial_confidence: f64,
    pub external_step: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            hourly_weight: 0.40,
            daily_weight: 0.30,
            sequential_weight: 0.50,
            external_weight: 0.40,
            prewarm_threshold: 0.25,
            min_samples: 3,
            max_recorded: 3,
            external_initial_confidence: 0.6,
            external_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub older_than_days: i64,
    /// Fraction of the distance to the default strength recovered per pass
    pub relax_fraction: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            older_than_days: 7,
            relax_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerConfig {
    pub max_input_chars: usize,
    pub timeout_ms: u64,
    /// Embedding calls allowed to run at once, abandoned ones included
    pub max_in_flight: usize,
}

impl CategorizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 500,
            timeout_ms: 2_000,
            max_in_flight: 32,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plasticity: PlasticityConfig,
    pub bias: BiasRange,
    pub feedback: FeedbackConfig,
    pub prediction: PredictionConfig,
    pub decay: DecayConfig,
    pub categorizer: CategorizerConfig,
    pub clock: SlotClock,
    pub workers: WorkerProfiles,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Defaults when the file does not exist; errors only for unreadable or invalid files
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json_file(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.plasticity;
        if !(p.min_strength < p.max_strength) {
            return Err(ConfigError::Invalid(format!(
                "min_strength {} must be below max_strength {}",
                p.min_strength, p.max_strength
            )));
        }
        if !(p.min_strength..=p.max_strength).contains(&p.default_strength) {
            return Err(ConfigError::Invalid(format!(
                "default_strength {} outside [{}, {}]",
                p.default_strength, p.min_strength, p.max_strength
            )));
        }
        if !(p.strengthen_rate > 0.0 && p.weaken_rate > 0.0) {
            return Err(ConfigError::Invalid(
                "plasticity rates must be positive".to_string(),
            ));
        }
        if !(self.bias.min < self.bias.max) {
            return Err(ConfigError::Invalid(format!(
                "bias min {} must be below bias max {}",
                self.bias.min, self.bias.max
            )));
        }

        let w = &self.prediction;
        let weights = [
            w.hourly_weight,
            w.daily_weight,
            w.sequential_weight,
            w.external_weight,
        ];
        if weights.iter().any(|weight| !(*weight >= 0.0)) {
            return Err(ConfigError::Invalid(
                "prediction weights must be non-negative".to_string(),
            ));
        }
        if w.max_recorded == 0 {
            return Err(ConfigError::Invalid(
                "prediction max_recorded must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&w.external_initial_confidence) {
            return Err(ConfigError::Invalid(
                "external_initial_confidence must lie in [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.decay.relax_fraction) {
            return Err(ConfigError::Invalid(
                "decay relax_fraction must lie in [0, 1]".to_string(),
            ));
        }
        if self.categorizer.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "categorizer timeout must be non-zero".to_string(),
            ));
        }
        if self.categorizer.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "categorizer max_in_flight must be non-zero".to_string(),
            ));
        }
        self.clock.validate().map_err(ConfigError::Invalid)?;

        for (worker, phrases) in &self.workers {
            if worker.trim().is_empty() || worker.contains('+') {
                return Err(ConfigError::Invalid(format!(
                    "worker id {worker:?} must be non-empty and must not contain '+'"
                )));
            }
            if phrases.iter().all(|p| p.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "worker {worker} has no exemplar phrases"
                )));
            }
        }
        Ok(())
    }
}
