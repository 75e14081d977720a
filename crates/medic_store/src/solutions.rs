//! Solution rows: candidate remedies owned by a problem fingerprint.
//!
//! A solution's identity is the exact `(fingerprint, steps)` pair; steps are
//! compared as the canonical JSON text because order matters in a recovery
//! procedure. Confidence arithmetic itself lives with the caller behind the
//! [`ConfidenceModel`] seam so the store stays policy-free.

use crate::{KnowledgeStore, StoreError, now_ts};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// Where a solution's track record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Built from outcomes this deployment observed itself
    Local,
    /// Imported from another agent's claim, not locally verified
    Peer,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Local => "local",
            Provenance::Peer => "peer",
        }
    }
}

impl std::str::FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Provenance::Local),
            "peer" => Ok(Provenance::Peer),
            other => Err(format!("unknown provenance: {other}")),
        }
    }
}

/// Confidence policy seam. The learner implements this; the store calls it
/// inside the outcome transaction so read-modify-write stays atomic.
pub trait ConfidenceModel: Send + Sync {
    /// Confidence for a brand-new solution after its first trial.
    fn initial(&self, success: bool) -> f64;

    /// Recomputed confidence after counts were bumped.
    fn recompute(&self, success_count: u32, failure_count: u32) -> f64;
}

/// A candidate remedy with its learned track record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionRow {
    pub id: i64,
    pub fingerprint: String,
    pub description: String,
    pub steps_json: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub confidence: f64,
    pub provenance: Provenance,
    pub created_by: String,
    pub created_at: String,
    pub last_used: Option<String>,
}

impl SolutionRow {
    pub fn total_attempts(&self) -> u32 {
        self.success_count + self.failure_count
    }
}

/// Seed values for a solution imported from a peer agent.
#[derive(Debug, Clone)]
pub struct ImportSeed {
    pub confidence: f64,
    pub success_count: u32,
    pub steps_json: String,
}

impl Default for ImportSeed {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            success_count: 1,
            steps_json: "[\"shared_solution\"]".to_string(),
        }
    }
}

/// Result of importing a shared solution.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    /// Placeholder solution was created
    Imported(SolutionRow),
    /// A solution from that source already exists; message consumed anyway
    AlreadyKnown,
    /// Another agent claimed the message first
    NotPending,
}

const SELECT_SOLUTION: &str = "SELECT id, fingerprint, description, steps, success_count, failure_count,
        confidence, provenance, created_by, created_at, last_used
 FROM solutions";

pub(crate) fn row_to_solution(row: &rusqlite::Row<'_>) -> rusqlite::Result<SolutionRow> {
    let provenance: String = row.get(7)?;
    Ok(SolutionRow {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        description: row.get(2)?,
        steps_json: row.get(3)?,
        success_count: row.get(4)?,
        failure_count: row.get(5)?,
        confidence: row.get(6)?,
        provenance: provenance.parse().unwrap_or(Provenance::Local),
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        last_used: row.get(10)?,
    })
}

impl KnowledgeStore {
    /// Record one attempt of a remedy against a fingerprint.
    ///
    /// Looks up the solution by the exact `(fingerprint, steps)` pair:
    /// if found, bumps the matching counter and recomputes confidence via
    /// `model`; otherwise inserts a new row seeded by `model.initial`.
    /// Runs as one transaction.
    pub fn record_solution_outcome(
        &self,
        fingerprint: &str,
        description: &str,
        steps_json: &str,
        success: bool,
        created_by: &str,
        model: &dyn ConfidenceModel,
    ) -> Result<SolutionRow, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = now_ts();

        let existing: Option<(i64, u32, u32)> = tx
            .query_row(
                "SELECT id, success_count, failure_count FROM solutions
                 WHERE fingerprint = ?1 AND steps = ?2",
                params![fingerprint, steps_json],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let id = match existing {
            Some((id, mut successes, mut failures)) => {
                if success {
                    successes += 1;
                } else {
                    failures += 1;
                }
                let confidence = model.recompute(successes, failures);
                tx.execute(
                    "UPDATE solutions
                     SET success_count = ?1, failure_count = ?2, confidence = ?3, last_used = ?4
                     WHERE id = ?5",
                    params![successes, failures, confidence, now, id],
                )?;
                id
            }
            None => {
                let (successes, failures) = if success { (1, 0) } else { (0, 1) };
                let confidence = model.initial(success);
                tx.execute(
                    "INSERT INTO solutions
                     (fingerprint, description, steps, success_count, failure_count,
                      confidence, provenance, created_by, created_at, last_used)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'local', ?7, ?8, ?8)",
                    params![
                        fingerprint,
                        description,
                        steps_json,
                        successes,
                        failures,
                        confidence,
                        created_by,
                        now
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        let row = tx.query_row(
            &format!("{SELECT_SOLUTION} WHERE id = ?1"),
            params![id],
            row_to_solution,
        )?;
        tx.commit()?;
        Ok(row)
    }

    /// Highest-confidence solution at or above `min_confidence`,
    /// tie-broken by success count. None means no remedy clears the gate.
    pub fn best_solution(
        &self,
        fingerprint: &str,
        min_confidence: f64,
    ) -> Result<Option<SolutionRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!(
                    "{SELECT_SOLUTION} WHERE fingerprint = ?1 AND confidence >= ?2
                     ORDER BY confidence DESC, success_count DESC LIMIT 1"
                ),
                params![fingerprint, min_confidence],
                row_to_solution,
            )
            .optional()?;
        Ok(row)
    }

    /// All solutions for a fingerprint, best first.
    pub fn solutions_for(&self, fingerprint: &str) -> Result<Vec<SolutionRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_SOLUTION} WHERE fingerprint = ?1
             ORDER BY confidence DESC, success_count DESC"
        ))?;
        let rows = stmt.query_map(params![fingerprint], row_to_solution)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Look up a solution by id.
    pub fn solution(&self, id: i64) -> Result<Option<SolutionRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("{SELECT_SOLUTION} WHERE id = ?1"),
                params![id],
                row_to_solution,
            )
            .optional()?;
        Ok(row)
    }

    /// Solutions this agent authored that clear the given sharing floor.
    pub fn shareable_solutions(
        &self,
        created_by: &str,
        min_confidence: f64,
        limit: usize,
    ) -> Result<Vec<SolutionRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_SOLUTION} WHERE created_by = ?1 AND confidence >= ?2
             ORDER BY confidence DESC, success_count DESC LIMIT ?3"
        ))?;
        let rows = stmt.query_map(params![created_by, min_confidence, limit as i64], row_to_solution)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
