//! medic_store - SQLite knowledge store for Medic
//!
//! This crate provides:
//! - Connection management with WAL mode for concurrent agent processes
//! - Schema migrations
//! - Typed access to problems, solutions, learning events, and
//!   agent collaboration messages
//!
//! All multi-statement mutations run inside a single transaction so
//! occurrence counters and confidence arithmetic stay correct when
//! several agents share one database file.

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, instrument};

pub mod collab;
pub mod migrations;
pub mod solutions;
pub mod stats;

pub use collab::{CollabMessageRow, MessageStatus, MessageType};
pub use solutions::{ConfidenceModel, ImportOutcome, ImportSeed, Provenance, SolutionRow};
pub use stats::{BestSolution, CollabStats, ProblemStats, TopProblem};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Learning event categories recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ProblemDetected,
    SolutionApplied,
    LearningUpdated,
    ChallengeDocumented,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProblemDetected => "PROBLEM_DETECTED",
            EventType::SolutionApplied => "SOLUTION_APPLIED",
            EventType::LearningUpdated => "LEARNING_UPDATED",
            EventType::ChallengeDocumented => "CHALLENGE_DOCUMENTED",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learned fault category. Append-only: rows are created on first
/// detection and only `last_seen`/`occurrence_count` move afterwards.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProblemRow {
    pub id: i64,
    pub fingerprint: String,
    pub kind: String,
    pub description: String,
    pub signature: String,
    pub severity: String,
    pub first_seen: String,
    pub last_seen: String,
    pub occurrence_count: u32,
}

/// Fields for a problem upsert.
#[derive(Debug, Clone)]
pub struct NewProblem<'a> {
    pub fingerprint: &'a str,
    pub kind: &'a str,
    pub description: &'a str,
    pub signature: &'a str,
    pub severity: &'a str,
}

/// An audit record of analyzer/learner activity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LearningEventRow {
    pub id: i64,
    pub agent_id: String,
    pub event_type: String,
    pub fingerprint: Option<String>,
    pub solution_id: Option<i64>,
    pub success: bool,
    pub details: String,
    pub created_at: String,
}

/// Main storage handle
#[derive(Clone)]
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

/// Current timestamp in the canonical on-disk format.
pub(crate) fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl KnowledgeStore {
    /// Open or create the knowledge database at `path`.
    ///
    /// The learning loop cannot function without its store, so opening
    /// failures propagate instead of degrading.
    #[instrument]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        info!(path = %path.display(), "Opening knowledge database");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets independent agent processes share the file; busy_timeout
        // makes concurrent upserts queue instead of erroring out.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            PRAGMA synchronous = NORMAL;
        "#,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_string_lossy().to_string(),
        };

        store.run_migrations()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        };

        store.run_migrations()?;

        Ok(store)
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.conn();
        migrations::run(&conn)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Get database path
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Flush the WAL so a clean shutdown leaves nothing pending.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    // =========================================================================
    // Problems
    // =========================================================================

    /// Insert a problem on first detection, or bump `occurrence_count` and
    /// `last_seen` on re-detection. One transaction per call.
    pub fn record_problem(&self, new: &NewProblem<'_>) -> Result<ProblemRow, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = now_ts();

        let existing: Option<u32> = tx
            .query_row(
                "SELECT occurrence_count FROM problems WHERE fingerprint = ?1",
                params![new.fingerprint],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(count) => {
                tx.execute(
                    "UPDATE problems SET last_seen = ?1, occurrence_count = ?2
                     WHERE fingerprint = ?3",
                    params![now, count + 1, new.fingerprint],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO problems
                     (fingerprint, kind, description, signature, severity, first_seen, last_seen, occurrence_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1)",
                    params![
                        new.fingerprint,
                        new.kind,
                        new.description,
                        new.signature,
                        new.severity,
                        now
                    ],
                )?;
            }
        }

        let row = tx.query_row(
            "SELECT id, fingerprint, kind, description, signature, severity,
                    first_seen, last_seen, occurrence_count
             FROM problems WHERE fingerprint = ?1",
            params![new.fingerprint],
            row_to_problem,
        )?;
        tx.commit()?;
        Ok(row)
    }

    /// Look up a problem by fingerprint.
    pub fn problem(&self, fingerprint: &str) -> Result<Option<ProblemRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, fingerprint, kind, description, signature, severity,
                        first_seen, last_seen, occurrence_count
                 FROM problems WHERE fingerprint = ?1",
                params![fingerprint],
                row_to_problem,
            )
            .optional()?;
        Ok(row)
    }

    /// Recent problems, most recently seen first.
    pub fn problems(&self, limit: usize) -> Result<Vec<ProblemRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, fingerprint, kind, description, signature, severity,
                    first_seen, last_seen, occurrence_count
             FROM problems ORDER BY last_seen DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_problem)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // =========================================================================
    // Learning events
    // =========================================================================

    /// Append a learning event. Write-once, never updated.
    pub fn log_event(
        &self,
        agent_id: &str,
        event_type: EventType,
        fingerprint: Option<&str>,
        solution_id: Option<i64>,
        success: bool,
        details: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO learning_events (agent_id, event_type, fingerprint, solution_id, success, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                agent_id,
                event_type.as_str(),
                fingerprint,
                solution_id,
                success,
                details,
                now_ts()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent learning events.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<LearningEventRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, agent_id, event_type, fingerprint, solution_id, success, details, created_at
             FROM learning_events ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LearningEventRow {
                id: row.get(0)?,
                agent_id: row.get(1)?,
                event_type: row.get(2)?,
                fingerprint: row.get(3)?,
                solution_id: row.get(4)?,
                success: row.get(5)?,
                details: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_problem(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProblemRow> {
    Ok(ProblemRow {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        kind: row.get(2)?,
        description: row.get(3)?,
        signature: row.get(4)?,
        severity: row.get(5)?,
        first_seen: row.get(6)?,
        last_seen: row.get(7)?,
        occurrence_count: row.get(8)?,
    })
}
