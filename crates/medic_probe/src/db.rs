//! SQLite file integrity probe.
//!
//! Opens the database read-only so a probe can never take a write lock
//! away from the service that owns the file.

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SqliteHealth {
    Healthy { size_mb: f64, page_count: u64 },
    Corrupted { detail: String },
    Missing,
    Error { detail: String },
}

/// Run `PRAGMA integrity_check` against a database file.
///
/// Blocking; callers on the async runtime should wrap this in
/// `spawn_blocking`.
pub fn sqlite_check(path: &Path) -> SqliteHealth {
    if !path.exists() {
        return SqliteHealth::Missing;
    }

    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(e) => {
            return SqliteHealth::Error {
                detail: e.to_string(),
            };
        }
    };

    let verdict: String = match conn.query_row("PRAGMA integrity_check", [], |row| row.get(0)) {
        Ok(v) => v,
        Err(e) => {
            return SqliteHealth::Error {
                detail: e.to_string(),
            };
        }
    };
    if verdict != "ok" {
        return SqliteHealth::Corrupted { detail: verdict };
    }

    // SQLite reports pragma values as i64.
    let page_count: i64 = conn
        .query_row("PRAGMA page_count", [], |row| row.get(0))
        .unwrap_or(0);
    let page_size: i64 = conn
        .query_row("PRAGMA page_size", [], |row| row.get(0))
        .unwrap_or(0);
    let page_count = u64::try_from(page_count).unwrap_or(0);
    let page_size = u64::try_from(page_size).unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let size_mb = (page_count * page_size) as f64 / (1024.0 * 1024.0);
    debug!(path = %path.display(), size_mb, "SQLite integrity check passed");
    SqliteHealth::Healthy {
        size_mb,
        page_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let health = sqlite_check(&dir.path().join("absent.db"));
        assert_eq!(health, SqliteHealth::Missing);
    }

    #[test]
    fn test_healthy_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        drop(conn);

        match sqlite_check(&path) {
            SqliteHealth::Healthy { page_count, .. } => assert!(page_count > 0),
            other => panic!("expected healthy, got {other:?}"),
        }
    }

    #[test]
    fn test_not_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"this is not a sqlite file at all, padding padding").unwrap();

        match sqlite_check(&path) {
            SqliteHealth::Error { .. } | SqliteHealth::Corrupted { .. } => {}
            other => panic!("expected error, got {other:?}"),
        }
    }
}
