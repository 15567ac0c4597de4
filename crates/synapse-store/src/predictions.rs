use crate::store::{fmt_ts, parse_ts};
use crate::{Result, Store};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use synapse_core::{AccuracyReport, Prediction, PredictionCandidate};

const PREDICTION_COLUMNS: &str = "id, created_at, predicted_category, confidence, basis, \
                                  pre_warmed, actual_category, hit, resolved";

impl Store {
    /// Persist candidates in the given order, returning their ids
    pub fn record_predictions(
        &self,
        candidates: &[PredictionCandidate],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(candidates.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO predictions (created_at, predicted_category, confidence, basis)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for candidate in candidates {
                stmt.execute(params![
                    fmt_ts(&now),
                    candidate.category,
                    candidate.confidence,
                    candidate.basis,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Flag the newest unresolved prediction for `category` as pre-warmed
    pub fn mark_prewarmed(&self, category: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE predictions SET pre_warmed = 1
             WHERE id = (
                SELECT id FROM predictions
                WHERE predicted_category = ?1 AND resolved = 0
                ORDER BY id DESC LIMIT 1
             )",
            params![category],
        )?;
        Ok(changed > 0)
    }

    /// Close every open prediction against the category that actually came
    /// next. Resolved rows are never touched again.
    pub fn resolve_predictions(&self, actual: &str) -> Result<usize> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE predictions
             SET actual_category = ?1,
                 hit = CASE WHEN predicted_category = ?1 THEN 1 ELSE 0 END,
                 resolved = 1
             WHERE resolved = 0",
            params![actual],
        )?;
        Ok(changed)
    }

    pub fn accuracy(&self) -> Result<AccuracyReport> {
        let conn = self.conn()?;
        let (total, hits, warmed, warm_hits): (i64, Option<i64>, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT COUNT(*),
                        SUM(hit),
                        SUM(pre_warmed),
                        SUM(CASE WHEN pre_warmed = 1 AND hit = 1 THEN 1 ELSE 0 END)
                 FROM predictions WHERE resolved = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        let count = |v: Option<i64>| v.unwrap_or(0).max(0) as u64;
        Ok(AccuracyReport::from_counts(
            total.max(0) as u64,
            count(hits),
            count(warmed),
            count(warm_hits),
        ))
    }

    /// Open predictions, most confident first
    pub fn pending_predictions(&self, limit: usize) -> Result<Vec<Prediction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions
             WHERE resolved = 0 ORDER BY confidence DESC, id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], row_to_prediction)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_prediction(&self, id: i64) -> Result<Option<Prediction>> {
        let conn = self.conn()?;
        let prediction = conn
            .query_row(
                &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = ?1"),
                params![id],
                row_to_prediction,
            )
            .optional()?;
        Ok(prediction)
    }
}

fn row_to_prediction(row: &rusqlite::Row) -> rusqlite::Result<Prediction> {
    Ok(Prediction {
        id: row.get(0)?,
        created_at: parse_ts(1, &row.get::<_, String>(1)?)?,
        predicted_category: row.get(2)?,
        confidence: row.get(3)?,
        basis: row.get(4)?,
        pre_warmed: row.get(5)?,
        actual_category: row.get(6)?,
        hit: row.get(7)?,
        resolved: row.get(8)?,
    })
}
