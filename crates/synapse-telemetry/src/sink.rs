//! Event sinks

use crate::{append_jsonl, SynapseEvent};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("event sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event sink unavailable: {0}")]
    Unavailable(String),
}

/// Receives engine events. Implementations may fail; callers never abort on it.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SynapseEvent) -> Result<(), TelemetryError>;
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &SynapseEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Appends every event as one JSON line
#[derive(Debug)]
pub struct JsonlEventSink {
    path: PathBuf,
    // serializes appends from concurrent request threads
    write_lock: Mutex<()>,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&self, event: &SynapseEvent) -> Result<(), TelemetryError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TelemetryError::Unavailable("event log lock poisoned".to_string()))?;
        append_jsonl(&self.path, event)?;
        Ok(())
    }
}

/// Emit an event, logging and swallowing any sink failure
pub fn emit_quietly(sink: &dyn EventSink, event: SynapseEvent) {
    if let Err(e) = sink.emit(&event) {
        tracing::debug!(kind = event.kind(), error = %e, "event emission failed");
    }
}
