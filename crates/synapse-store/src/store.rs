use crate::{Result, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use synapse_core::PathwayStats;

/// Handle to the engine database.
///
/// A single connection behind a mutex: every read-modify-write runs inside a
/// transaction while the lock is held, so updates to one row never interleave.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        // journal_mode answers with a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS synaptic_pathways (
                category TEXT NOT NULL,
                worker TEXT NOT NULL,
                strength REAL NOT NULL,
                fire_count INTEGER NOT NULL DEFAULT 0,
                success_count INTEGER NOT NULL DEFAULT 0,
                fail_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (category, worker)
            );
            CREATE INDEX IF NOT EXISTS idx_pathways_updated ON synaptic_pathways(updated_at);

            CREATE TABLE IF NOT EXISTS interaction_traces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT,
                timestamp TEXT NOT NULL,
                query_hash TEXT NOT NULL,
                category TEXT NOT NULL,
                workers_routed TEXT NOT NULL,
                response_length INTEGER NOT NULL DEFAULT 0,
                execution_ms REAL NOT NULL DEFAULT 0,
                feedback_signal REAL,
                feedback_source TEXT,
                resolved INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_traces_resolved ON interaction_traces(resolved);
            CREATE INDEX IF NOT EXISTS idx_traces_category ON interaction_traces(category);
            CREATE INDEX IF NOT EXISTS idx_traces_timestamp ON interaction_traces(timestamp);

            CREATE TABLE IF NOT EXISTS temporal_patterns (
                pattern_type TEXT NOT NULL,
                time_slot TEXT NOT NULL,
                category TEXT NOT NULL,
                frequency REAL NOT NULL DEFAULT 0,
                sample_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (pattern_type, time_slot, category)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                predicted_category TEXT NOT NULL,
                confidence REAL NOT NULL,
                basis TEXT NOT NULL,
                pre_warmed INTEGER NOT NULL DEFAULT 0,
                actual_category TEXT,
                hit INTEGER,
                resolved INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_predictions_resolved ON predictions(resolved);
            ",
        )?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Dashboard counters over pathways and resolved traces
    pub fn stats(&self) -> Result<PathwayStats> {
        let conn = self.conn()?;
        let (pathways, avg_strength): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(strength) FROM synaptic_pathways",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (interactions, positive, negative): (i64, Option<i64>, Option<i64>) = conn.query_row(
            "SELECT COUNT(*),
                    SUM(CASE WHEN resolved = 1 AND feedback_signal > 0 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN resolved = 1 AND feedback_signal < 0 THEN 1 ELSE 0 END)
             FROM interaction_traces",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(PathwayStats {
            pathways: pathways as u64,
            interactions: interactions as u64,
            avg_strength: avg_strength
                .map(|avg| (avg * 10_000.0).round() / 10_000.0)
                .unwrap_or(0.5),
            positive_signals: positive.unwrap_or(0) as u64,
            negative_signals: negative.unwrap_or(0) as u64,
        })
    }
}

/// Fixed-width UTC timestamps so text comparison orders chronologically
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| invalid_column(idx, format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn parse_column<T: FromStr<Err = String>>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse().map_err(|e: String| invalid_column(idx, e))
}

pub(crate) fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message,
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let db_path = temp.path().join("nested").join("synapse.db");

        let store = Store::open(&db_path).unwrap();
        assert!(db_path.exists());
        let stats = store.stats().unwrap();
        assert_eq!(stats.pathways, 0);
        assert_eq!(stats.interactions, 0);
        assert_eq!(stats.avg_strength, 0.5);

        // reopening an existing database is fine
        drop(store);
        Store::open(&db_path).unwrap();
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early: DateTime<Utc> = "2026-01-01T09:00:00Z".parse().unwrap();
        let late: DateTime<Utc> = "2026-01-01T10:00:00.5Z".parse().unwrap();
        assert!(fmt_ts(&early) < fmt_ts(&late));
        assert_eq!(parse_ts(0, &fmt_ts(&late)).unwrap(), late);
    }
}
