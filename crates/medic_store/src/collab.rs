//! Agent collaboration messages: the shared-database mailbox agents use to
//! exchange proven solutions.
//!
//! Every message is consumed exactly once. Consumption is an atomic
//! test-and-set on `status = 'PENDING'` inside the import transaction, so
//! two agents racing on the same row cannot both process it.

use crate::solutions::{ImportOutcome, ImportSeed, row_to_solution};
use crate::{KnowledgeStore, StoreError, now_ts};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    ShareSolution,
    RequestHelp,
    StatusUpdate,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::ShareSolution => "SHARE_SOLUTION",
            MessageType::RequestHelp => "REQUEST_HELP",
            MessageType::StatusUpdate => "STATUS_UPDATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Processed,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Processed => "PROCESSED",
            MessageStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MessageStatus::Pending),
            "PROCESSED" => Ok(MessageStatus::Processed),
            "FAILED" => Ok(MessageStatus::Failed),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabMessageRow {
    pub id: i64,
    pub source_agent: String,
    pub target_agent: Option<String>,
    pub message_type: String,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: String,
    pub processed_at: Option<String>,
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<CollabMessageRow> {
    let status: String = row.get(5)?;
    Ok(CollabMessageRow {
        id: row.get(0)?,
        source_agent: row.get(1)?,
        target_agent: row.get(2)?,
        message_type: row.get(3)?,
        content: row.get(4)?,
        status: status.parse().unwrap_or(MessageStatus::Pending),
        created_at: row.get(6)?,
        processed_at: row.get(7)?,
    })
}

const SELECT_MESSAGE: &str = "SELECT id, source_agent, target_agent, message_type, content, status,
        created_at, processed_at
 FROM agent_collaboration";

impl KnowledgeStore {
    /// Publish a message. `target_agent` of `None` means broadcast.
    pub fn publish_message(
        &self,
        source_agent: &str,
        target_agent: Option<&str>,
        message_type: MessageType,
        content: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO agent_collaboration
             (source_agent, target_agent, message_type, content, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5)",
            params![source_agent, target_agent, message_type.as_str(), content, now_ts()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Pending solution-share messages published by other agents,
    /// oldest first. The reading agent's own messages are excluded.
    pub fn pending_share_messages(
        &self,
        exclude_agent: &str,
    ) -> Result<Vec<CollabMessageRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_MESSAGE}
             WHERE status = 'PENDING' AND message_type = 'SHARE_SOLUTION'
               AND source_agent != ?1
             ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![exclude_agent], row_to_message)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Look up a message by id.
    pub fn message(&self, id: i64) -> Result<Option<CollabMessageRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("{SELECT_MESSAGE} WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()?;
        Ok(row)
    }

    /// Import a shared solution, consuming its message exactly once.
    ///
    /// One transaction: claim the message (test-and-set on PENDING), then
    /// insert a placeholder solution seeded from `seed` unless this store
    /// already holds an import from that source for the fingerprint. The
    /// author's own local row never counts as an import: in a shared
    /// database it is always visible, and the peer copy is a separate row.
    /// The imported row's track record is synthetic until local outcomes
    /// replace it.
    pub fn import_shared_solution(
        &self,
        message_id: i64,
        fingerprint: &str,
        description: &str,
        source_agent: &str,
        importing_agent: &str,
        seed: &ImportSeed,
    ) -> Result<ImportOutcome, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = now_ts();

        let claimed = tx.execute(
            "UPDATE agent_collaboration SET status = 'PROCESSED', processed_at = ?1
             WHERE id = ?2 AND status = 'PENDING'",
            params![now, message_id],
        )?;
        if claimed == 0 {
            return Ok(ImportOutcome::NotPending);
        }

        let created_by = format!("imported_from_{source_agent}");
        let known: Option<i64> = tx
            .query_row(
                "SELECT id FROM solutions
                 WHERE fingerprint = ?1 AND created_by = ?2",
                params![fingerprint, created_by],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_some() {
            tx.commit()?;
            tracing::debug!(
                message_id,
                fingerprint,
                source_agent,
                "shared solution already known, message consumed"
            );
            return Ok(ImportOutcome::AlreadyKnown);
        }

        tx.execute(
            "INSERT INTO solutions
             (fingerprint, description, steps, success_count, failure_count,
              confidence, provenance, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, 'peer', ?6, ?7)",
            params![
                fingerprint,
                description,
                seed.steps_json,
                seed.success_count,
                seed.confidence,
                created_by,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        let row = tx.query_row(
            "SELECT id, fingerprint, description, steps, success_count, failure_count,
                    confidence, provenance, created_by, created_at, last_used
             FROM solutions WHERE id = ?1",
            params![id],
            row_to_solution,
        )?;
        tx.commit()?;
        tracing::info!(message_id, fingerprint, source_agent, by = importing_agent, "imported shared solution");
        Ok(ImportOutcome::Imported(row))
    }

    /// Mark a malformed or unprocessable message FAILED. No-op when the
    /// message was already consumed by someone else.
    pub fn mark_message_failed(&self, message_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE agent_collaboration SET status = 'FAILED', processed_at = ?1
             WHERE id = ?2 AND status = 'PENDING'",
            params![now_ts(), message_id],
        )?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewProblem;
    use crate::solutions::Provenance;

    fn store_with_problem(fingerprint: &str) -> KnowledgeStore {
        let store = KnowledgeStore::open_memory().unwrap();
        store
            .record_problem(&NewProblem {
                fingerprint,
                kind: "DB_LOCKED",
                description: "database is locked",
                signature: "sig",
                severity: "HIGH",
            })
            .unwrap();
        store
    }

    #[test]
    fn test_publish_and_list_excludes_own_messages() {
        let store = store_with_problem("fp1");
        store
            .publish_message("agent_a", None, MessageType::ShareSolution, "{}")
            .unwrap();
        store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();
        store
            .publish_message("agent_b", None, MessageType::StatusUpdate, "{}")
            .unwrap();

        let for_a = store.pending_share_messages("agent_a").unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].source_agent, "agent_b");

        let for_b = store.pending_share_messages("agent_b").unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].source_agent, "agent_a");
    }

    #[test]
    fn test_import_consumes_message_once() {
        let store = store_with_problem("fp1");
        let id = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();

        let first = store
            .import_shared_solution(id, "fp1", "restart it", "agent_b", "agent_a", &ImportSeed::default())
            .unwrap();
        let ImportOutcome::Imported(row) = first else {
            panic!("expected import");
        };
        assert!((row.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(row.success_count, 1);
        assert_eq!(row.created_by, "imported_from_agent_b");

        // Second claim on the same message loses the test-and-set.
        let second = store
            .import_shared_solution(id, "fp1", "restart it", "agent_b", "agent_c", &ImportSeed::default())
            .unwrap();
        assert!(matches!(second, ImportOutcome::NotPending));

        let msg = store.message(id).unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Processed);
        assert!(msg.processed_at.is_some());
    }

    #[test]
    fn test_duplicate_source_still_consumes_message() {
        let store = store_with_problem("fp1");
        let first = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();
        store
            .import_shared_solution(first, "fp1", "restart it", "agent_b", "agent_a", &ImportSeed::default())
            .unwrap();

        let second = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();
        let outcome = store
            .import_shared_solution(second, "fp1", "restart it", "agent_b", "agent_a", &ImportSeed::default())
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::AlreadyKnown));
        assert_eq!(
            store.message(second).unwrap().unwrap().status,
            MessageStatus::Processed
        );
        assert_eq!(store.solutions_for("fp1").unwrap().len(), 1);
    }

    #[test]
    fn test_authors_own_row_does_not_block_import() {
        // Agents share one database file, so the author's local solution
        // row is visible to the importer. It must not be mistaken for a
        // prior import.
        struct OneShot;
        impl crate::solutions::ConfidenceModel for OneShot {
            fn initial(&self, success: bool) -> f64 {
                if success { 1.0 } else { 0.1 }
            }
            fn recompute(&self, s: u32, f: u32) -> f64 {
                f64::from(s) / f64::from(s + f)
            }
        }

        let store = store_with_problem("fp1");
        store
            .record_solution_outcome("fp1", "restart it", "[\"wait:1\"]", true, "agent_b", &OneShot)
            .unwrap();

        let id = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();
        let outcome = store
            .import_shared_solution(id, "fp1", "restart it", "agent_b", "agent_a", &ImportSeed::default())
            .unwrap();
        let ImportOutcome::Imported(row) = outcome else {
            panic!("expected import alongside the author's own row");
        };
        assert_eq!(row.created_by, "imported_from_agent_b");
        assert_eq!(row.provenance, Provenance::Peer);
        assert_eq!(store.solutions_for("fp1").unwrap().len(), 2);
    }

    #[test]
    fn test_mark_failed_only_when_pending() {
        let store = store_with_problem("fp1");
        let id = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "not json")
            .unwrap();
        assert!(store.mark_message_failed(id).unwrap());
        assert!(!store.mark_message_failed(id).unwrap());
        assert_eq!(
            store.message(id).unwrap().unwrap().status,
            MessageStatus::Failed
        );
    }
}
