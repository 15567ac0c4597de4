use crate::store::{fmt_ts, invalid_column, parse_column, parse_ts};
use crate::{Result, Store};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use synapse_core::{Feedback, FeedbackSource, InteractionTrace, NewTrace, UNKNOWN_CATEGORY};

const TRACE_COLUMNS: &str = "id, session_id, timestamp, query_hash, category, workers_routed, \
                             response_length, execution_ms, feedback_signal, feedback_source, \
                             resolved";

/// The unresolved trace a new insertion is about to resolve.
/// `timestamp` is kept raw so malformed values reach the inferencer as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTrace {
    pub id: i64,
    pub query_hash: String,
    pub category: String,
    pub workers_routed: BTreeSet<String>,
    pub timestamp: String,
}

/// Outcome of resolving the previous trace
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrace {
    pub trace_id: i64,
    pub category: String,
    pub workers_routed: BTreeSet<String>,
    pub feedback: Feedback,
}

impl Store {
    /// Insert a trace and resolve the most recent earlier unresolved one in a
    /// single transaction. `infer` is only called when there is something to
    /// resolve; the resolution is returned only if this call flipped the row.
    pub fn insert_trace_and_resolve<F>(
        &self,
        trace: &NewTrace,
        infer: F,
    ) -> Result<(i64, Option<ResolvedTrace>)>
    where
        F: FnOnce(&PendingTrace) -> Feedback,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let workers = serde_json::to_string(&trace.workers_routed)?;
        tx.execute(
            "INSERT INTO interaction_traces
                (session_id, timestamp, query_hash, category, workers_routed,
                 response_length, execution_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                trace.session_id,
                fmt_ts(&trace.timestamp),
                trace.query_hash,
                trace.category,
                workers,
                trace.response_length as i64,
                trace.execution_ms,
            ],
        )?;
        let trace_id = tx.last_insert_rowid();

        let pending = tx
            .query_row(
                "SELECT id, query_hash, category, workers_routed, timestamp
                 FROM interaction_traces
                 WHERE resolved = 0 AND id < ?1
                 ORDER BY id DESC LIMIT 1",
                params![trace_id],
                |row| {
                    Ok(PendingTrace {
                        id: row.get(0)?,
                        query_hash: row.get(1)?,
                        category: row.get(2)?,
                        workers_routed: parse_workers(3, &row.get::<_, String>(3)?)?,
                        timestamp: row.get(4)?,
                    })
                },
            )
            .optional()?;

        let resolved = match pending {
            Some(pending) => {
                let feedback = infer(&pending);
                if resolve_on(&tx, pending.id, &feedback)? {
                    Some(ResolvedTrace {
                        trace_id: pending.id,
                        category: pending.category,
                        workers_routed: pending.workers_routed,
                        feedback,
                    })
                } else {
                    None
                }
            }
            None => None,
        };

        tx.commit()?;
        Ok((trace_id, resolved))
    }

    /// Mark a trace resolved. Returns false when it already was (or does not exist).
    pub fn resolve_trace(&self, trace_id: i64, feedback: &Feedback) -> Result<bool> {
        let conn = self.conn()?;
        resolve_on(&conn, trace_id, feedback)
    }

    pub fn get_trace(&self, trace_id: i64) -> Result<Option<InteractionTrace>> {
        let conn = self.conn()?;
        let trace = conn
            .query_row(
                &format!("SELECT {TRACE_COLUMNS} FROM interaction_traces WHERE id = ?1"),
                params![trace_id],
                row_to_trace,
            )
            .optional()?;
        Ok(trace)
    }

    /// The single trace still waiting for its successor, if any
    pub fn pending_trace(&self) -> Result<Option<InteractionTrace>> {
        let conn = self.conn()?;
        let trace = conn
            .query_row(
                &format!(
                    "SELECT {TRACE_COLUMNS} FROM interaction_traces
                     WHERE resolved = 0 ORDER BY id DESC LIMIT 1"
                ),
                [],
                row_to_trace,
            )
            .optional()?;
        Ok(trace)
    }

    /// Every trace in timestamp order (ties by id). Rows whose columns no
    /// longer parse are skipped with a warning.
    pub fn list_traces(&self) -> Result<Vec<InteractionTrace>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACE_COLUMNS} FROM interaction_traces ORDER BY timestamp ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], row_to_trace)?;

        let mut traces = Vec::new();
        for row in rows {
            match row {
                Ok(trace) => traces.push(trace),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable trace"),
            }
        }
        Ok(traces)
    }

    /// Category of the most recent trace that had one
    pub fn last_known_category(&self) -> Result<Option<String>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT category FROM interaction_traces
                 WHERE category != ?1 ORDER BY id DESC LIMIT 1",
                params![UNKNOWN_CATEGORY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(category)
    }
}

fn resolve_on(conn: &Connection, trace_id: i64, feedback: &Feedback) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE interaction_traces
         SET feedback_signal = ?1, feedback_source = ?2, resolved = 1
         WHERE id = ?3 AND resolved = 0",
        params![feedback.signal, feedback.source.as_str(), trace_id],
    )?;
    Ok(changed == 1)
}

fn parse_workers(idx: usize, raw: &str) -> rusqlite::Result<BTreeSet<String>> {
    serde_json::from_str(raw).map_err(|e| invalid_column(idx, format!("bad worker list: {e}")))
}

fn row_to_trace(row: &rusqlite::Row) -> rusqlite::Result<InteractionTrace> {
    let feedback_source = row
        .get::<_, Option<String>>(9)?
        .map(|raw| parse_column::<FeedbackSource>(9, &raw))
        .transpose()?;

    Ok(InteractionTrace {
        id: row.get(0)?,
        session_id: row.get(1)?,
        timestamp: parse_ts(2, &row.get::<_, String>(2)?)?,
        query_hash: row.get(3)?,
        category: row.get(4)?,
        workers_routed: parse_workers(5, &row.get::<_, String>(5)?)?,
        response_length: row.get::<_, i64>(6)?.max(0) as u64,
        execution_ms: row.get(7)?,
        feedback_signal: row.get(8)?,
        feedback_source,
        resolved: row.get(10)?,
    })
}
