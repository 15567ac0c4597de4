//! Engine facade wired for an external request dispatcher.
//!
//! Request-path calls (`categorize`, `record_interaction`, `routing_bias`,
//! `predict_next`, `prewarm`) never fail: faults are logged and turned into
//! the "no signal" value. Maintenance jobs return their store errors so the
//! scheduler running them can report.

use crate::categorizer::QueryCategorizer;
use crate::embed::{Embedder, UnavailableEmbedder};
use crate::miner::TemporalPatternMiner;
use crate::plasticity::PlasticityEngine;
use crate::predictor::Predictor;
use crate::prewarm::{ContextSource, PrewarmCache};
use crate::pruner::Pruner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use synapse_core::{
    fingerprint, is_unknown, AccuracyReport, Config, FeedbackInferencer, FeedbackSource,
    NewTrace, PathwayStats, Prediction, PredictionCandidate, SynapticPathway, TemporalPattern,
};
use synapse_store::{Store, StoreError};
use synapse_telemetry::{emit_quietly, EventSink, NoopSink, SynapseEvent};

const DEFAULT_EXTERNAL_SLOT: &str = "external";
const MAX_EXTERNAL_CATEGORY_CHARS: usize = 200;
const SYNTHETIC_WORDS_PER_WORKER: usize = 5;

/// One completed request as reported by the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub text: String,
    pub workers: Vec<String>,
    pub execution_ms: f64,
    pub response_length: u64,
    pub session_id: Option<String>,
}

impl Interaction {
    pub fn new<S: Into<String>>(text: impl Into<String>, workers: impl IntoIterator<Item = S>) -> Self {
        Self {
            text: text.into(),
            workers: workers.into_iter().map(Into::into).collect(),
            execution_ms: 0.0,
            response_length: 0,
            session_id: None,
        }
    }

    pub fn with_execution_ms(mut self, execution_ms: f64) -> Self {
        self.execution_ms = execution_ms;
        self
    }

    pub fn with_response_length(mut self, response_length: u64) -> Self {
        self.response_length = response_length;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Feedback inferred for the previous trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFeedback {
    pub trace_id: i64,
    pub signal: f64,
    pub source: FeedbackSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    pub trace_id: i64,
    pub category: String,
    pub resolved: Option<ResolvedFeedback>,
}

pub struct Synapse {
    config: Config,
    store: Arc<Store>,
    embedder: Arc<dyn Embedder>,
    sink: Arc<dyn EventSink>,
    categorizer: QueryCategorizer,
    inferencer: FeedbackInferencer,
    plasticity: PlasticityEngine,
    miner: TemporalPatternMiner,
    predictor: Predictor,
    pruner: Pruner,
    cache: PrewarmCache,
}

impl Synapse {
    /// Engine without an embedding provider or event sink: every request
    /// categorizes as `UNKNOWN` until `with_embedder` is used.
    pub fn new(config: Config, store: Arc<Store>) -> Self {
        Self::assemble(config, store, Arc::new(UnavailableEmbedder), Arc::new(NoopSink))
    }

    pub fn with_embedder(self, embedder: Arc<dyn Embedder>) -> Self {
        Self::assemble(self.config, self.store, embedder, self.sink)
    }

    pub fn with_sink(self, sink: Arc<dyn EventSink>) -> Self {
        Self::assemble(self.config, self.store, self.embedder, sink)
    }

    fn assemble(
        config: Config,
        store: Arc<Store>,
        embedder: Arc<dyn Embedder>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            categorizer: QueryCategorizer::new(
                embedder.clone(),
                config.workers.clone(),
                config.categorizer,
            ),
            inferencer: FeedbackInferencer::new(config.feedback),
            plasticity: PlasticityEngine::new(store.clone(), sink.clone(), config.plasticity),
            miner: TemporalPatternMiner::new(config.clock, config.prediction.min_samples),
            predictor: Predictor::new(store.clone(), sink.clone(), config.prediction, config.clock),
            pruner: Pruner::new(store.clone(), config.plasticity, config.decay),
            cache: PrewarmCache::new(),
            config,
            store,
            embedder,
            sink,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn categorize(&self, text: &str) -> String {
        self.categorizer.categorize(text)
    }

    pub fn record_interaction(&self, interaction: &Interaction) -> Option<RecordOutcome> {
        self.record_interaction_at(interaction, Utc::now())
    }

    /// Store the trace and resolve the one before it, reinforcing that
    /// trace's pathways. `None` when the trace could not be persisted.
    pub fn record_interaction_at(
        &self,
        interaction: &Interaction,
        now: DateTime<Utc>,
    ) -> Option<RecordOutcome> {
        let category = self.categorize(&interaction.text);
        let query_hash = fingerprint(&interaction.text);
        let trace = NewTrace {
            session_id: interaction.session_id.clone(),
            timestamp: now,
            query_hash: query_hash.clone(),
            category: category.clone(),
            workers_routed: interaction
                .workers
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect(),
            response_length: interaction.response_length,
            execution_ms: interaction.execution_ms,
        };

        let inferencer = self.inferencer;
        let recorded = self.store.insert_trace_and_resolve(&trace, |prev| {
            inferencer.infer(
                &prev.query_hash,
                &prev.category,
                &query_hash,
                &category,
                &prev.timestamp,
                now,
            )
        });
        let (trace_id, resolved) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to record interaction");
                return None;
            }
        };

        let resolved = resolved.map(|prev| {
            tracing::debug!(
                trace_id = prev.trace_id,
                source = %prev.feedback.source,
                signal = prev.feedback.signal,
                "resolved previous interaction"
            );
            for worker in &prev.workers_routed {
                self.reinforce(&prev.category, worker, prev.feedback.signal, now);
            }
            ResolvedFeedback {
                trace_id: prev.trace_id,
                signal: prev.feedback.signal,
                source: prev.feedback.source,
            }
        });

        Some(RecordOutcome {
            trace_id,
            category,
            resolved,
        })
    }

    /// Strong negative feedback from an out-of-band reviewer, applied right away
    pub fn record_rejection(&self, text: &str, workers: &[String]) -> String {
        self.record_rejection_at(text, workers, Utc::now())
    }

    pub fn record_rejection_at(&self, text: &str, workers: &[String], now: DateTime<Utc>) -> String {
        let category = self.categorize(text);
        let signal = FeedbackSource::Rejected.signal();
        for worker in workers.iter().map(|w| w.trim()).filter(|w| !w.is_empty()) {
            self.reinforce(&category, worker, signal, now);
        }
        category
    }

    fn reinforce(&self, category: &str, worker: &str, signal: f64, now: DateTime<Utc>) {
        if let Err(e) = self.plasticity.apply(category, worker, signal, now) {
            tracing::warn!(category, worker, error = %e, "pathway update lost");
        }
    }

    /// Worker -> multiplier for the request's category. Empty means "no bias".
    pub fn routing_bias(&self, text: &str) -> HashMap<String, f64> {
        let category = self.categorize(text);
        self.bias_for_category(&category)
    }

    pub fn bias_for_category(&self, category: &str) -> HashMap<String, f64> {
        if is_unknown(category) {
            return HashMap::new();
        }
        match self.store.pathways_for_category(category) {
            Ok(pathways) => pathways
                .into_iter()
                .map(|p| {
                    let bias = self.config.bias.project(p.strength, &self.config.plasticity);
                    (p.worker, bias)
                })
                .collect(),
            Err(e) => {
                tracing::warn!(category, error = %e, "routing bias unavailable");
                HashMap::new()
            }
        }
    }

    pub fn mine_patterns(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.miner.rebuild(&self.store, now)
    }

    /// Ranked candidates for what comes next, using the latest known
    /// category for the sequential lens
    pub fn predict_next(&self, now: DateTime<Utc>) -> Vec<PredictionCandidate> {
        let last = self.store.last_known_category().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "last category unavailable");
            None
        });
        self.predictor
            .predict_next(now, last.as_deref())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "prediction skipped");
                Vec::new()
            })
    }

    /// Fetch context for the top prediction into the pop-once cache.
    /// Returns the warmed category.
    pub fn prewarm(&self, source: &dyn ContextSource, now: DateTime<Utc>) -> Option<String> {
        let top = self.predict_next(now).into_iter().next()?;
        let query = self.synthetic_query(&top.category);
        if query.is_empty() {
            return None;
        }

        let fragments = match source.fetch(&query) {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!(category = %top.category, error = %e, "pre-warm fetch failed");
                return None;
            }
        };
        if fragments.is_empty() {
            tracing::debug!(category = %top.category, "nothing to pre-warm");
            return None;
        }

        let count = fragments.len();
        self.cache.store(&top.category, fragments);
        if let Err(e) = self.store.mark_prewarmed(&top.category) {
            tracing::warn!(category = %top.category, error = %e, "could not flag prediction");
        }
        tracing::info!(category = %top.category, fragments = count, "context pre-warmed");
        Some(top.category)
    }

    /// Pop pre-warmed context for `category`
    pub fn take_prewarmed(&self, category: &str) -> Vec<String> {
        let fragments = self.cache.take_once(category);
        if !fragments.is_empty() {
            emit_quietly(
                self.sink.as_ref(),
                SynapseEvent::PredictionHit {
                    category: category.to_string(),
                    fragment_count: fragments.len(),
                },
            );
        }
        fragments
    }

    // First words of each named worker's first exemplar, or the ids themselves
    fn synthetic_query(&self, category: &str) -> String {
        let workers: Vec<&str> = category.split('+').filter(|w| !w.is_empty()).collect();
        let words: Vec<&str> = workers
            .iter()
            .filter_map(|w| self.config.workers.get(*w))
            .filter_map(|phrases| phrases.first())
            .flat_map(|phrase| phrase.split_whitespace().take(SYNTHETIC_WORDS_PER_WORKER))
            .collect();
        if words.is_empty() {
            workers.join(" ")
        } else {
            words.join(" ")
        }
    }

    pub fn resolve_predictions(&self, actual_category: &str) -> Result<usize, StoreError> {
        let resolved = self.store.resolve_predictions(actual_category)?;
        tracing::debug!(actual = actual_category, resolved, "predictions resolved");
        Ok(resolved)
    }

    pub fn accuracy(&self) -> Result<AccuracyReport, StoreError> {
        self.store.accuracy()
    }

    pub fn decay_unused(&self, older_than_days: i64, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.pruner.decay(older_than_days, now)
    }

    /// Seed an external pattern. Blank categories are ignored (`Ok(None)`).
    pub fn register_external_pattern(
        &self,
        category: &str,
        slot: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<TemporalPattern>, StoreError> {
        let category: String = category.trim().chars().take(MAX_EXTERNAL_CATEGORY_CHARS).collect();
        if category.is_empty() {
            return Ok(None);
        }
        let slot = slot
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EXTERNAL_SLOT);
        let prediction = &self.config.prediction;
        let pattern = self.store.register_external_pattern(
            slot,
            &category,
            prediction.external_initial_confidence,
            prediction.external_step,
            now,
        )?;
        tracing::debug!(slot, category = %pattern.category, frequency = pattern.frequency, "external pattern registered");
        Ok(Some(pattern))
    }

    pub fn stats(&self) -> Result<PathwayStats, StoreError> {
        self.store.stats()
    }

    pub fn top_pathways(&self, limit: usize) -> Result<Vec<SynapticPathway>, StoreError> {
        self.store.top_pathways(limit)
    }

    pub fn pending_predictions(&self, limit: usize) -> Result<Vec<Prediction>, StoreError> {
        self.store.pending_predictions(limit)
    }
}
