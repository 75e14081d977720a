//! Schema migrations for the knowledge database.
//!
//! The whole schema is one idempotent batch; re-running it is a no-op.
//! The four tables mirror the logical model: problems (fault categories),
//! solutions (candidate remedies), learning_events (audit trail), and
//! agent_collaboration (inter-agent message bus).

use crate::StoreError;
use rusqlite::Connection;
use tracing::debug;

/// Run all migrations.
pub fn run(conn: &Connection) -> Result<(), StoreError> {
    debug!("Running knowledge store migrations");
    conn.execute_batch(SCHEMA)
        .map_err(|e| StoreError::MigrationError(e.to_string()))?;
    Ok(())
}

const SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS problems (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint      TEXT UNIQUE NOT NULL,
    kind             TEXT NOT NULL,
    description      TEXT NOT NULL,
    signature        TEXT NOT NULL DEFAULT '',
    severity         TEXT NOT NULL DEFAULT 'MEDIUM',
    first_seen       TEXT NOT NULL,
    last_seen        TEXT NOT NULL,
    occurrence_count INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_problems_fingerprint ON problems(fingerprint);

CREATE TABLE IF NOT EXISTS solutions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint   TEXT NOT NULL REFERENCES problems(fingerprint),
    description   TEXT NOT NULL,
    steps         TEXT NOT NULL,              -- canonical JSON array of step strings
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    confidence    REAL NOT NULL DEFAULT 0.0,
    provenance    TEXT NOT NULL DEFAULT 'local',  -- 'local' | 'peer'
    created_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_used     TEXT
);
CREATE INDEX IF NOT EXISTS idx_solutions_fingerprint ON solutions(fingerprint);

CREATE TABLE IF NOT EXISTS learning_events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id    TEXT NOT NULL,
    event_type  TEXT NOT NULL,   -- PROBLEM_DETECTED | SOLUTION_APPLIED | LEARNING_UPDATED | CHALLENGE_DOCUMENTED
    fingerprint TEXT,
    solution_id INTEGER,
    success     INTEGER NOT NULL DEFAULT 0,
    details     TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_learning_events_agent ON learning_events(agent_id);

CREATE TABLE IF NOT EXISTS agent_collaboration (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    source_agent TEXT NOT NULL,
    target_agent TEXT,
    message_type TEXT NOT NULL,  -- SHARE_SOLUTION | REQUEST_HELP | STATUS_UPDATE
    content      TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'PENDING',  -- PENDING | PROCESSED | FAILED
    created_at   TEXT NOT NULL,
    processed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_collaboration_agents ON agent_collaboration(source_agent, target_agent);

"#;
