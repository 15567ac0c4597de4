//! Doubles shared by the unit tests

use crate::prewarm::{ContextError, ContextSource};
use std::sync::Mutex;
use synapse_telemetry::{EventSink, SynapseEvent, TelemetryError};

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SynapseEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SynapseEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SynapseEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub(crate) struct FailingSink;

impl EventSink for FailingSink {
    fn emit(&self, _event: &SynapseEvent) -> Result<(), TelemetryError> {
        Err(TelemetryError::Unavailable("bus down".to_string()))
    }
}

/// Answers every query with fixed fragments and remembers what it was asked
pub(crate) struct StaticContext {
    pub fragments: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticContext {
    pub(crate) fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl ContextSource for StaticContext {
    fn fetch(&self, query: &str) -> Result<Vec<String>, ContextError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.fragments.clone())
    }
}

pub(crate) struct BrokenContext;

impl ContextSource for BrokenContext {
    fn fetch(&self, _query: &str) -> Result<Vec<String>, ContextError> {
        Err(ContextError("memory offline".to_string()))
    }
}
