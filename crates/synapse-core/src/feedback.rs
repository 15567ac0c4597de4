//! Implicit feedback inferred from what the user did next

use crate::config::FeedbackConfig;
use crate::types::FeedbackSource;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub signal: f64,
    pub source: FeedbackSource,
}

impl From<FeedbackSource> for Feedback {
    fn from(source: FeedbackSource) -> Self {
        Self {
            signal: source.signal(),
            source,
        }
    }
}

/// Seconds between a stored timestamp and `now`, or `None` when unparsable.
///
/// Accepts RFC 3339 and SQLite's `YYYY-MM-DD HH:MM:SS` (read as UTC).
pub fn elapsed_secs(prev_timestamp: &str, now: DateTime<Utc>) -> Option<f64> {
    let raw = prev_timestamp.trim();
    let prev = DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ts| ts.and_utc())
        })
        .ok()?;
    Some((now - prev).num_milliseconds() as f64 / 1000.0)
}

/// Decision table turning two consecutive requests into a signal
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackInferencer {
    config: FeedbackConfig,
}

impl FeedbackInferencer {
    pub fn new(config: FeedbackConfig) -> Self {
        Self { config }
    }

    /// Infer feedback for the previous request. Never fails: an unparsable
    /// timestamp counts as the configured default elapsed time.
    pub fn infer(
        &self,
        prev_hash: &str,
        prev_category: &str,
        curr_hash: &str,
        curr_category: &str,
        prev_timestamp: &str,
        now: DateTime<Utc>,
    ) -> Feedback {
        let elapsed = elapsed_secs(prev_timestamp, now).unwrap_or(self.config.default_elapsed_secs);
        self.decide(prev_hash, prev_category, curr_hash, curr_category, elapsed)
    }

    /// First matching rule wins
    pub fn decide(
        &self,
        prev_hash: &str,
        prev_category: &str,
        curr_hash: &str,
        curr_category: &str,
        elapsed: f64,
    ) -> Feedback {
        let source = if prev_hash == curr_hash {
            FeedbackSource::RephrasedSame
        } else if elapsed < self.config.fast_follow_up_secs && prev_category != curr_category {
            FeedbackSource::FastFollowUp
        } else if prev_category == curr_category {
            FeedbackSource::FollowUpSame
        } else if elapsed > self.config.long_silence_secs {
            FeedbackSource::LongSilenceNew
        } else {
            FeedbackSource::TopicChange
        };
        source.into()
    }
}
