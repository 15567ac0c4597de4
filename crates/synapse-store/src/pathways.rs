use crate::store::{fmt_ts, parse_ts};
use crate::{Result, Store};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::{PathwayState, SynapticPathway};

const PATHWAY_COLUMNS: &str = "category, worker, strength, fire_count, success_count, \
                               fail_count, created_at, updated_at";

impl Store {
    pub fn get_pathway(&self, category: &str, worker: &str) -> Result<Option<SynapticPathway>> {
        let conn = self.conn()?;
        get_pathway_on(&conn, category, worker)
    }

    /// Write a pathway's numeric state, creating the row if needed
    pub fn upsert_pathway(
        &self,
        category: &str,
        worker: &str,
        state: &PathwayState,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        upsert_pathway_on(&conn, category, worker, state, now)
    }

    /// Atomic read-modify-write of one pathway.
    ///
    /// `update` sees the stored state, or `default` for a pair never seen
    /// before. Returns the state before and after.
    pub fn modify_pathway<F>(
        &self,
        category: &str,
        worker: &str,
        default: PathwayState,
        now: DateTime<Utc>,
        update: F,
    ) -> Result<(PathwayState, PathwayState)>
    where
        F: FnOnce(PathwayState) -> PathwayState,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let before = get_pathway_on(&tx, category, worker)?
            .map(|p| p.state())
            .unwrap_or(default);
        let after = update(before);
        upsert_pathway_on(&tx, category, worker, &after, now)?;
        tx.commit()?;
        Ok((before, after))
    }

    pub fn pathways_for_category(&self, category: &str) -> Result<Vec<SynapticPathway>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM synaptic_pathways WHERE category = ?1 ORDER BY worker"
        ))?;
        let rows = stmt.query_map(params![category], row_to_pathway)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Strongest-used pathways first
    pub fn top_pathways(&self, limit: usize) -> Result<Vec<SynapticPathway>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM synaptic_pathways
             ORDER BY fire_count DESC, strength DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], row_to_pathway)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rewrite the strength of every pathway not updated since `cutoff`.
    /// Rows are never removed. Returns how many were touched.
    pub fn relax_stale_pathways<F>(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        relax: F,
    ) -> Result<usize>
    where
        F: Fn(f64) -> f64,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let stale: Vec<(String, String, f64)> = {
            let mut stmt = tx.prepare(
                "SELECT category, worker, strength FROM synaptic_pathways WHERE updated_at < ?1",
            )?;
            let rows = stmt.query_map(params![fmt_ts(&cutoff)], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for (category, worker, strength) in &stale {
            tx.execute(
                "UPDATE synaptic_pathways SET strength = ?1, updated_at = ?2
                 WHERE category = ?3 AND worker = ?4",
                params![relax(*strength), fmt_ts(&now), category, worker],
            )?;
        }
        tx.commit()?;
        Ok(stale.len())
    }
}

fn get_pathway_on(
    conn: &Connection,
    category: &str,
    worker: &str,
) -> Result<Option<SynapticPathway>> {
    let pathway = conn
        .query_row(
            &format!(
                "SELECT {PATHWAY_COLUMNS} FROM synaptic_pathways
                 WHERE category = ?1 AND worker = ?2"
            ),
            params![category, worker],
            row_to_pathway,
        )
        .optional()?;
    Ok(pathway)
}

fn upsert_pathway_on(
    conn: &Connection,
    category: &str,
    worker: &str,
    state: &PathwayState,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO synaptic_pathways
            (category, worker, strength, fire_count, success_count, fail_count,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(category, worker) DO UPDATE SET
            strength = excluded.strength,
            fire_count = excluded.fire_count,
            success_count = excluded.success_count,
            fail_count = excluded.fail_count,
            updated_at = excluded.updated_at",
        params![
            category,
            worker,
            state.strength,
            state.fire_count as i64,
            state.success_count as i64,
            state.fail_count as i64,
            fmt_ts(&now),
        ],
    )?;
    Ok(())
}

fn row_to_pathway(row: &rusqlite::Row) -> rusqlite::Result<SynapticPathway> {
    Ok(SynapticPathway {
        category: row.get(0)?,
        worker: row.get(1)?,
        strength: row.get(2)?,
        fire_count: row.get::<_, i64>(3)?.max(0) as u64,
        success_count: row.get::<_, i64>(4)?.max(0) as u64,
        fail_count: row.get::<_, i64>(5)?.max(0) as u64,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
        updated_at: parse_ts(7, &row.get::<_, String>(7)?)?,
    })
}
