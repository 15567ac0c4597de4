use chrono::{DateTime, Utc};
use std::sync::Arc;
use synapse_core::{PathwayState, PlasticityConfig};
use synapse_store::{Store, StoreError};
use synapse_telemetry::{emit_quietly, EventSink, SynapseEvent};

/// Applies signals to pathways with the bounded update rule
pub struct PlasticityEngine {
    store: Arc<Store>,
    sink: Arc<dyn EventSink>,
    rule: PlasticityConfig,
}

impl PlasticityEngine {
    pub fn new(store: Arc<Store>, sink: Arc<dyn EventSink>, rule: PlasticityConfig) -> Self {
        Self { store, sink, rule }
    }

    /// Reinforce one (category, worker) pathway and return its new state.
    /// Nothing is emitted when the write fails.
    pub fn apply(
        &self,
        category: &str,
        worker: &str,
        signal: f64,
        now: DateTime<Utc>,
    ) -> Result<PathwayState, StoreError> {
        let rule = self.rule;
        let (before, after) = self
            .store
            .modify_pathway(category, worker, rule.fresh(), now, |state| {
                rule.reinforce(state, signal)
            })?;

        tracing::debug!(
            category,
            worker,
            signal,
            old = before.strength,
            new = after.strength,
            "pathway updated"
        );
        emit_quietly(
            self.sink.as_ref(),
            SynapseEvent::PathwayUpdated {
                category: category.to_string(),
                worker: worker.to_string(),
                old_strength: before.strength,
                new_strength: after.strength,
                signal,
            },
        );
        Ok(after)
    }

    pub fn rule(&self) -> &PlasticityConfig {
        &self.rule
    }
}
