use crate::store::{fmt_ts, parse_column, parse_ts};
use crate::{Result, Store};
use chrono::{DateTime, Utc};
use rusqlite::params;
use synapse_core::{PatternType, TemporalPattern};

const PATTERN_COLUMNS: &str = "pattern_type, time_slot, category, frequency, sample_count, updated_at";

impl Store {
    /// Upsert a freshly mined set of rows, overwriting frequency and sample
    /// count for keys that already exist. Runs as one transaction.
    pub fn replace_patterns(&self, patterns: &[TemporalPattern]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO temporal_patterns
                    (pattern_type, time_slot, category, frequency, sample_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(pattern_type, time_slot, category) DO UPDATE SET
                    frequency = excluded.frequency,
                    sample_count = excluded.sample_count,
                    updated_at = excluded.updated_at",
            )?;
            for pattern in patterns {
                stmt.execute(params![
                    pattern.pattern_type.as_str(),
                    pattern.time_slot,
                    pattern.category,
                    pattern.frequency,
                    pattern.sample_count as i64,
                    fmt_ts(&pattern.updated_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(patterns.len())
    }

    /// Rows of one lens for one slot with enough observations behind them
    pub fn patterns_for_slot(
        &self,
        pattern_type: PatternType,
        time_slot: &str,
        min_samples: u64,
    ) -> Result<Vec<TemporalPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATTERN_COLUMNS} FROM temporal_patterns
             WHERE pattern_type = ?1 AND time_slot = ?2 AND sample_count >= ?3
             ORDER BY frequency DESC, category ASC"
        ))?;
        let rows = stmt.query_map(
            params![pattern_type.as_str(), time_slot, min_samples as i64],
            row_to_pattern,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every row of one lens regardless of slot
    pub fn patterns_of_type(
        &self,
        pattern_type: PatternType,
        min_samples: u64,
    ) -> Result<Vec<TemporalPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATTERN_COLUMNS} FROM temporal_patterns
             WHERE pattern_type = ?1 AND sample_count >= ?2
             ORDER BY time_slot ASC, frequency DESC, category ASC"
        ))?;
        let rows = stmt.query_map(
            params![pattern_type.as_str(), min_samples as i64],
            row_to_pattern,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Seed or reinforce an external row: `initial` on first sight, then
    /// `step` more per registration, capped at 1.0.
    pub fn register_external_pattern(
        &self,
        time_slot: &str,
        category: &str,
        initial: f64,
        step: f64,
        now: DateTime<Utc>,
    ) -> Result<TemporalPattern> {
        let conn = self.conn()?;
        let pattern = conn.query_row(
            &format!(
                "INSERT INTO temporal_patterns
                    (pattern_type, time_slot, category, frequency, sample_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?6)
                 ON CONFLICT(pattern_type, time_slot, category) DO UPDATE SET
                    frequency = MIN(frequency + ?5, 1.0),
                    sample_count = sample_count + 1,
                    updated_at = excluded.updated_at
                 RETURNING {PATTERN_COLUMNS}"
            ),
            params![
                PatternType::External.as_str(),
                time_slot,
                category,
                initial.min(1.0),
                step,
                fmt_ts(&now),
            ],
            row_to_pattern,
        )?;
        Ok(pattern)
    }
}

fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<TemporalPattern> {
    Ok(TemporalPattern {
        pattern_type: parse_column(0, &row.get::<_, String>(0)?)?,
        time_slot: row.get(1)?,
        category: row.get(2)?,
        frequency: row.get(3)?,
        sample_count: row.get::<_, i64>(4)?.max(0) as u64,
        updated_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}
