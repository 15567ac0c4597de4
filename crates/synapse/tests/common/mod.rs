#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use synapse_core::{Config, SlotClock, WorkerProfiles};
use synapse_learn::{ContextError, ContextSource, EmbedError, Embedder, Synapse};
use synapse_store::Store;
use synapse_telemetry::{EventSink, SynapseEvent, TelemetryError};

pub const KEYWORDS: [&str; 6] = ["bitcoin", "price", "weather", "forecast", "code", "rust"];

/// "bitcoin price and weather" categorizes here
pub const MARKETS: &str = "CIPHER+ORACLE";
/// "rust code for bitcoin" categorizes here
pub const TOOLING: &str = "CIPHER+IOLAAX";

/// One dimension per keyword, 1.0 when the text mentions it
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let lower = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SynapseEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SynapseEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SynapseEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Hands back fixed fragments and remembers the queries it was asked
pub struct StaticContext {
    fragments: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticContext {
    pub fn new(fragments: &[&str]) -> Self {
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

pub fn sample_profiles() -> WorkerProfiles {
    let mut profiles = WorkerProfiles::new();
    profiles.insert("CIPHER".to_string(), vec!["bitcoin price".to_string()]);
    profiles.insert("ORACLE".to_string(), vec!["weather forecast".to_string()]);
    profiles.insert(
        "IOLAAX".to_string(),
        vec!["write code".to_string(), "rust compiler".to_string()],
    );
    profiles
}

pub fn sample_config() -> Config {
    Config {
        workers: sample_profiles(),
        clock: SlotClock::utc(),
        ..Config::default()
    }
}

pub fn engine_on(store: Arc<Store>, sink: Arc<RecordingSink>) -> Synapse {
    Synapse::new(sample_config(), store)
        .with_embedder(Arc::new(KeywordEmbedder))
        .with_sink(sink)
}

pub fn memory_engine() -> (Synapse, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(Store::open_in_memory().unwrap());
    (engine_on(store, sink.clone()), sink)
}

/// Monday 2026-03-02 09:00 UTC
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}
