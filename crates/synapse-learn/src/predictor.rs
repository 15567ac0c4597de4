//! Next-category prediction from the temporal lenses

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use synapse_core::{PatternType, PredictionCandidate, PredictionConfig, SlotClock, TemporalPattern};
use synapse_store::{Store, StoreError};
use synapse_telemetry::{emit_quietly, CandidateSummary, EventSink, SynapseEvent};

/// Absorbs float noise when a score lands exactly on the threshold
const THRESHOLD_EPSILON: f64 = 1e-9;

/// External rows count from their first registration
const EXTERNAL_MIN_SAMPLES: u64 = 1;

/// Pattern rows matching the current moment, one list per lens
#[derive(Debug, Clone, Default)]
pub struct LensMatches {
    pub hourly: Vec<TemporalPattern>,
    pub daily: Vec<TemporalPattern>,
    pub sequential: Vec<TemporalPattern>,
    pub external: Vec<TemporalPattern>,
}

#[derive(Default)]
struct Score {
    total: f64,
    lenses: [bool; 4],
}

pub struct Predictor {
    store: Arc<Store>,
    sink: Arc<dyn EventSink>,
    config: PredictionConfig,
    clock: SlotClock,
}

impl Predictor {
    pub fn new(
        store: Arc<Store>,
        sink: Arc<dyn EventSink>,
        config: PredictionConfig,
        clock: SlotClock,
    ) -> Self {
        Self {
            store,
            sink,
            config,
            clock,
        }
    }

    /// Combine lens matches into candidates above the pre-warm threshold,
    /// highest score first (ties by category).
    pub fn rank(config: &PredictionConfig, matches: &LensMatches) -> Vec<PredictionCandidate> {
        let lenses = [
            (PatternType::Hourly, &matches.hourly, config.hourly_weight),
            (PatternType::Daily, &matches.daily, config.daily_weight),
            (PatternType::Sequential, &matches.sequential, config.sequential_weight),
            (PatternType::External, &matches.external, config.external_weight),
        ];

        let mut scores: BTreeMap<&str, Score> = BTreeMap::new();
        for (idx, (_, rows, weight)) in lenses.iter().enumerate() {
            for row in rows.iter() {
                let score = scores.entry(row.category.as_str()).or_default();
                score.total += row.frequency * weight;
                score.lenses[idx] = true;
            }
        }

        let mut candidates: Vec<(f64, PredictionCandidate)> = scores
            .into_iter()
            .filter(|(_, score)| score.total + THRESHOLD_EPSILON >= config.prewarm_threshold)
            .map(|(category, score)| {
                let basis: Vec<&str> = lenses
                    .iter()
                    .zip(score.lenses)
                    .filter(|(_, used)| *used)
                    .map(|((kind, _, _), _)| kind.as_str())
                    .collect();
                let candidate = PredictionCandidate {
                    category: category.to_string(),
                    confidence: round4(score.total),
                    basis: basis.join("+"),
                };
                (score.total, candidate)
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.category.cmp(&b.1.category))
        });
        candidates.into_iter().map(|(_, c)| c).collect()
    }

    /// Rows for the slots `now` falls into, plus sequential rows keyed by
    /// `last_category` and every external row
    pub fn matches_at(
        &self,
        now: DateTime<Utc>,
        last_category: Option<&str>,
    ) -> Result<LensMatches, StoreError> {
        let (hour, weekday) = self.clock.slots(&now);
        let min = self.config.min_samples;
        let sequential = match last_category {
            Some(last) => self
                .store
                .patterns_for_slot(PatternType::Sequential, last, min)?,
            None => Vec::new(),
        };
        Ok(LensMatches {
            hourly: self
                .store
                .patterns_for_slot(PatternType::Hourly, &hour.to_string(), min)?,
            daily: self
                .store
                .patterns_for_slot(PatternType::Daily, &weekday.to_string(), min)?,
            sequential,
            external: self
                .store
                .patterns_of_type(PatternType::External, EXTERNAL_MIN_SAMPLES)?,
        })
    }

    /// Rank candidates for `now`, persist the top few and announce them
    pub fn predict_next(
        &self,
        now: DateTime<Utc>,
        last_category: Option<&str>,
    ) -> Result<Vec<PredictionCandidate>, StoreError> {
        let matches = self.matches_at(now, last_category)?;
        let candidates = Self::rank(&self.config, &matches);
        if candidates.is_empty() {
            tracing::debug!("no prediction above threshold");
            return Ok(candidates);
        }

        let top = &candidates[..candidates.len().min(self.config.max_recorded)];
        let Some(best) = top.first() else {
            return Ok(candidates);
        };
        self.store.record_predictions(top, now)?;

        let (hour, weekday) = self.clock.slots(&now);
        tracing::debug!(
            top = %best.category,
            confidence = best.confidence,
            "predicted next category"
        );
        emit_quietly(
            self.sink.as_ref(),
            SynapseEvent::PredictionMade {
                candidates: top
                    .iter()
                    .map(|c| CandidateSummary {
                        category: c.category.clone(),
                        confidence: c.confidence,
                        basis: c.basis.clone(),
                    })
                    .collect(),
                hour,
                weekday,
            },
        );
        Ok(candidates)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use chrono::TimeZone;

    fn row(kind: PatternType, slot: &str, category: &str, frequency: f64) -> TemporalPattern {
        TemporalPattern {
            pattern_type: kind,
            time_slot: slot.to_string(),
            category: category.to_string(),
            frequency,
            sample_count: 5,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let config = PredictionConfig::default();
        // 0.6 * 0.40 = 0.24 stays below, 0.65 * 0.40 = 0.26 passes
        let below = LensMatches {
            hourly: vec![row(PatternType::Hourly, "9", "A+B", 0.6)],
            ..Default::default()
        };
        assert!(Predictor::rank(&config, &below).is_empty());

        let above = LensMatches {
            hourly: vec![row(PatternType::Hourly, "9", "A+B", 0.65)],
            ..Default::default()
        };
        let ranked = Predictor::rank(&config, &above);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].confidence, 0.26);
        assert_eq!(ranked[0].basis, "hourly");
    }

    #[test]
    fn test_lenses_combine_and_order() {
        let config = PredictionConfig::default();
        let matches = LensMatches {
            hourly: vec![
                row(PatternType::Hourly, "9", "A+B", 0.5),
                row(PatternType::Hourly, "9", "C+D", 0.5),
            ],
            daily: vec![row(PatternType::Daily, "0", "A+B", 1.0)],
            sequential: vec![row(PatternType::Sequential, "E+F", "C+D", 1.0)],
            external: vec![row(PatternType::External, "external", "G+H", 0.6)],
        };
        let ranked = Predictor::rank(&config, &matches);
        let order: Vec<_> = ranked.iter().map(|c| c.category.as_str()).collect();
        // C+D 0.70, A+B 0.50, G+H 0.24 (dropped)
        assert_eq!(order, vec!["C+D", "A+B"]);
        assert_eq!(ranked[0].basis, "hourly+sequential");
        assert_eq!(ranked[0].confidence, 0.7);
        assert_eq!(ranked[1].basis, "hourly+daily");
        assert_eq!(ranked[1].confidence, 0.5);
    }

    #[test]
    fn test_predict_persists_top_three_and_emits() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let sink = Arc::new(RecordingSink::default());
        let predictor = Predictor::new(
            store.clone(),
            sink.clone(),
            PredictionConfig::default(),
            SlotClock::utc(),
        );
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        for category in ["A", "B", "C", "D"] {
            store
                .register_external_pattern("external", category, 0.7, 0.05, now)
                .unwrap();
        }

        let ranked = predictor.predict_next(now, None).unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(store.pending_predictions(10).unwrap().len(), 3);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SynapseEvent::PredictionMade {
                candidates,
                hour,
                weekday,
            } => {
                assert_eq!(candidates.len(), 3);
                assert_eq!((*hour, *weekday), (9, 0));
                assert_eq!(candidates[0].basis, "external");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_nothing_recorded_when_limit_is_zero() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let sink = Arc::new(RecordingSink::default());
        let config = PredictionConfig {
            max_recorded: 0,
            ..PredictionConfig::default()
        };
        let predictor = Predictor::new(store.clone(), sink.clone(), config, SlotClock::utc());
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        store
            .register_external_pattern("external", "A+B", 0.7, 0.05, now)
            .unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let ranked = tracing::subscriber::with_default(subscriber, || {
            predictor.predict_next(now, None).unwrap()
        });
        assert_eq!(ranked.len(), 1);
        assert!(store.pending_predictions(10).unwrap().is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_sequential_needs_last_category() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let predictor = Predictor::new(
            store.clone(),
            Arc::new(RecordingSink::default()),
            PredictionConfig::default(),
            SlotClock::utc(),
        );
        store
            .replace_patterns(&[row(PatternType::Sequential, "A+B", "C+D", 1.0)])
            .unwrap();

        assert!(predictor.predict_next(Utc::now(), None).unwrap().is_empty());
        let ranked = predictor.predict_next(Utc::now(), Some("A+B")).unwrap();
        assert_eq!(ranked[0].category, "C+D");
        assert_eq!(ranked[0].basis, "sequential");
    }
}
