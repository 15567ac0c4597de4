//! Records for the four persisted tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Category returned when no learned signal applies
pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";

pub fn is_unknown(category: &str) -> bool {
    category == UNKNOWN_CATEGORY
}

/// Content fingerprint of a request: case- and outer-whitespace-insensitive
pub fn fingerprint(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let hash = blake3::hash(normalized.as_bytes()).to_hex();
    hash.as_str()[..16].to_string()
}

/// Numeric part of a pathway, the unit plasticity operates on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathwayState {
    pub strength: f64,
    pub fire_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
}

impl PathwayState {
    pub fn fresh(strength: f64) -> Self {
        Self {
            strength,
            fire_count: 0,
            success_count: 0,
            fail_count: 0,
        }
    }
}

/// Learned preference of one worker for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapticPathway {
    pub category: String,
    pub worker: String,
    pub strength: f64,
    pub fire_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SynapticPathway {
    pub fn state(&self) -> PathwayState {
        PathwayState {
            strength: self.strength,
            fire_count: self.fire_count,
            success_count: self.success_count,
            fail_count: self.fail_count,
        }
    }
}

/// How an implicit feedback signal was inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    /// Same request repeated: frustration
    RephrasedSame,
    /// Different topic within seconds: rejection
    FastFollowUp,
    /// Asked again about the same category: dissatisfaction
    FollowUpSame,
    /// New topic after a long pause: moderate satisfaction
    LongSilenceNew,
    /// Clean topic change: satisfaction
    TopicChange,
    /// Answer rejected by an out-of-band reviewer
    Rejected,
}

impl FeedbackSource {
    pub const ALL: [FeedbackSource; 6] = [
        FeedbackSource::RephrasedSame,
        FeedbackSource::FastFollowUp,
        FeedbackSource::FollowUpSame,
        FeedbackSource::LongSilenceNew,
        FeedbackSource::TopicChange,
        FeedbackSource::Rejected,
    ];

    pub fn signal(self) -> f64 {
        match self {
            FeedbackSource::RephrasedSame => -0.6,
            FeedbackSource::FastFollowUp => -0.3,
            FeedbackSource::FollowUpSame => -0.4,
            FeedbackSource::LongSilenceNew => 0.2,
            FeedbackSource::TopicChange => 0.3,
            FeedbackSource::Rejected => -0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackSource::RephrasedSame => "rephrased_same",
            FeedbackSource::FastFollowUp => "fast_follow_up",
            FeedbackSource::FollowUpSame => "follow_up_same",
            FeedbackSource::LongSilenceNew => "long_silence_new",
            FeedbackSource::TopicChange => "topic_change",
            FeedbackSource::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| format!("unknown feedback source: {s}"))
    }
}

/// Fields supplied by the caller when a request completes
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrace {
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query_hash: String,
    pub category: String,
    pub workers_routed: BTreeSet<String>,
    pub response_length: u64,
    pub execution_ms: f64,
}

/// One handled request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTrace {
    pub id: i64,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query_hash: String,
    pub category: String,
    pub workers_routed: BTreeSet<String>,
    pub response_length: u64,
    pub execution_ms: f64,
    pub feedback_signal: Option<f64>,
    pub feedback_source: Option<FeedbackSource>,
    pub resolved: bool,
}

/// Temporal lens a pattern row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Hourly,
    Daily,
    Sequential,
    External,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::Hourly => "hourly",
            PatternType::Daily => "daily",
            PatternType::Sequential => "sequential",
            PatternType::External => "external",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(PatternType::Hourly),
            "daily" => Ok(PatternType::Daily),
            "sequential" => Ok(PatternType::Sequential),
            "external" => Ok(PatternType::External),
            other => Err(format!("unknown pattern type: {other}")),
        }
    }
}

/// Frequency of a category within a time slot.
///
/// For `Sequential` rows the slot is the preceding category and
/// `category` is the one that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPattern {
    pub pattern_type: PatternType,
    pub time_slot: String,
    pub category: String,
    pub frequency: f64,
    pub sample_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Ranked output of the predictor, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    pub category: String,
    pub confidence: f64,
    pub basis: String,
}

/// A persisted prediction awaiting (or after) resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub predicted_category: String,
    pub confidence: f64,
    pub basis: String,
    pub pre_warmed: bool,
    pub actual_category: Option<String>,
    pub hit: Option<bool>,
    pub resolved: bool,
}

/// Self-measured prediction quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub total: u64,
    pub hits: u64,
    pub hit_rate: f64,
    pub pre_warmed_count: u64,
    pub warm_hit_rate: f64,
}

impl AccuracyReport {
    pub fn from_counts(total: u64, hits: u64, pre_warmed: u64, warm_hits: u64) -> Self {
        let ratio = |num: u64, den: u64| {
            if den == 0 {
                0.0
            } else {
                round4(num as f64 / den as f64)
            }
        };
        Self {
            total,
            hits,
            hit_rate: ratio(hits, total),
            pre_warmed_count: pre_warmed,
            warm_hit_rate: ratio(warm_hits, pre_warmed),
        }
    }
}

/// Dashboard counters over pathways and traces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathwayStats {
    pub pathways: u64,
    pub interactions: u64,
    pub avg_strength: f64,
    pub positive_signals: u64,
    pub negative_signals: u64,
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
