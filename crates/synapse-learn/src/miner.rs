//! Full rebuild of temporal patterns from trace history

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use synapse_core::{is_unknown, InteractionTrace, PatternType, SlotClock, TemporalPattern};
use synapse_store::{Store, StoreError};

type Counts = BTreeMap<String, BTreeMap<String, u64>>;

#[derive(Debug, Clone, Copy)]
pub struct TemporalPatternMiner {
    clock: SlotClock,
    min_samples: u64,
}

impl TemporalPatternMiner {
    pub fn new(clock: SlotClock, min_samples: u64) -> Self {
        Self { clock, min_samples }
    }

    /// Hourly, daily and sequential rows for `traces`.
    ///
    /// Only resolved traces with a known category count. Returns nothing
    /// when fewer than `min_samples` of them exist.
    pub fn mine(&self, traces: &[InteractionTrace], now: DateTime<Utc>) -> Vec<TemporalPattern> {
        let mut usable: Vec<&InteractionTrace> = traces
            .iter()
            .filter(|t| t.resolved && !is_unknown(&t.category))
            .collect();
        if (usable.len() as u64) < self.min_samples {
            return Vec::new();
        }
        usable.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut hourly = Counts::new();
        let mut daily = Counts::new();
        for trace in &usable {
            let (hour, weekday) = self.clock.slots(&trace.timestamp);
            bump(&mut hourly, hour.to_string(), &trace.category);
            bump(&mut daily, weekday.to_string(), &trace.category);
        }

        let mut sequential = Counts::new();
        for pair in usable.windows(2) {
            bump(&mut sequential, pair[0].category.clone(), &pair[1].category);
        }

        let mut patterns = Vec::new();
        for (pattern_type, counts) in [
            (PatternType::Hourly, hourly),
            (PatternType::Daily, daily),
            (PatternType::Sequential, sequential),
        ] {
            for (slot, categories) in counts {
                let total: u64 = categories.values().sum();
                for (category, count) in categories {
                    patterns.push(TemporalPattern {
                        pattern_type,
                        time_slot: slot.clone(),
                        category,
                        frequency: count as f64 / total as f64,
                        sample_count: count,
                        updated_at: now,
                    });
                }
            }
        }
        patterns
    }

    /// Mine the store's full history and overwrite the pattern table
    pub fn rebuild(&self, store: &Store, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let traces = store.list_traces()?;
        let patterns = self.mine(&traces, now);
        if patterns.is_empty() {
            tracing::info!(traces = traces.len(), "not enough history to mine patterns");
            return Ok(0);
        }
        let written = store.replace_patterns(&patterns)?;
        tracing::info!(traces = traces.len(), patterns = written, "temporal patterns rebuilt");
        Ok(written)
    }
}

fn bump(counts: &mut Counts, slot: String, category: &str) {
    *counts
        .entry(slot)
        .or_default()
        .entry(category.to_string())
        .or_insert(0) += 1;
}
