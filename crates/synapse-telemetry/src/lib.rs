//! Event model, sinks and on-disk layout for the synapse engine

mod events;
mod io;
mod paths;
mod sink;

pub use events::{CandidateSummary, SynapseEvent};
pub use io::{append_jsonl, atomic_write, read_jsonl};
pub use paths::{Paths, HOME_ENV};
pub use sink::{emit_quietly, EventSink, JsonlEventSink, NoopSink, TelemetryError};
