//! Aggregate queries backing status output and the learning report.

use crate::{KnowledgeStore, ProblemRow, StoreError, row_to_problem};
use rusqlite::params;
use serde::Serialize;

/// Headline counters over the whole knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemStats {
    pub total_problems: u64,
    pub total_occurrences: u64,
    pub total_solutions: u64,
    pub high_confidence_solutions: u64,
    pub learning_events: u64,
}

/// One row of the most-seen-problems table.
#[derive(Debug, Clone, Serialize)]
pub struct TopProblem {
    pub fingerprint: String,
    pub kind: String,
    pub description: String,
    pub occurrence_count: u32,
    pub last_seen: String,
    pub best_confidence: Option<f64>,
}

/// A proven remedy joined with the problem it treats.
#[derive(Debug, Clone, Serialize)]
pub struct BestSolution {
    pub fingerprint: String,
    pub problem_kind: String,
    pub description: String,
    pub confidence: f64,
    pub success_count: u32,
    pub failure_count: u32,
}

/// Message traffic counters for the collaboration mailbox.
#[derive(Debug, Clone, Serialize)]
pub struct CollabStats {
    pub pending: u64,
    pub processed: u64,
    pub failed: u64,
    pub published_by_agent: u64,
}

/// SQLite hands counts back as `i64`; they are never negative.
fn as_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

impl KnowledgeStore {
    pub fn problem_stats(&self, confidence_floor: f64) -> Result<ProblemStats, StoreError> {
        let conn = self.conn();
        let (total_problems, total_occurrences): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), SUM(occurrence_count) FROM problems",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let total_solutions: i64 =
            conn.query_row("SELECT COUNT(*) FROM solutions", [], |row| row.get(0))?;
        let high_confidence_solutions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM solutions WHERE confidence >= ?1",
            params![confidence_floor],
            |row| row.get(0),
        )?;
        let learning_events: i64 =
            conn.query_row("SELECT COUNT(*) FROM learning_events", [], |row| row.get(0))?;
        Ok(ProblemStats {
            total_problems: as_count(total_problems),
            total_occurrences: as_count(total_occurrences.unwrap_or(0)),
            total_solutions: as_count(total_solutions),
            high_confidence_solutions: as_count(high_confidence_solutions),
            learning_events: as_count(learning_events),
        })
    }

    /// Problems ranked by how often they recur, with the best confidence
    /// any of their solutions has reached.
    pub fn top_problems(&self, limit: usize) -> Result<Vec<TopProblem>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.fingerprint, p.kind, p.description, p.occurrence_count, p.last_seen,
                    (SELECT MAX(s.confidence) FROM solutions s WHERE s.fingerprint = p.fingerprint)
             FROM problems p
             ORDER BY p.occurrence_count DESC, p.last_seen DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TopProblem {
                fingerprint: row.get(0)?,
                kind: row.get(1)?,
                description: row.get(2)?,
                occurrence_count: row.get(3)?,
                last_seen: row.get(4)?,
                best_confidence: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The highest-confidence solution per problem, best first.
    pub fn best_solutions(&self, limit: usize) -> Result<Vec<BestSolution>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.fingerprint, p.kind, s.description, s.confidence,
                    s.success_count, s.failure_count
             FROM solutions s
             JOIN problems p ON p.fingerprint = s.fingerprint
             WHERE s.id IN (
                 SELECT id FROM solutions s2
                 WHERE s2.fingerprint = s.fingerprint
                 ORDER BY s2.confidence DESC, s2.success_count DESC LIMIT 1
             )
             ORDER BY s.confidence DESC, s.success_count DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(BestSolution {
                fingerprint: row.get(0)?,
                problem_kind: row.get(1)?,
                description: row.get(2)?,
                confidence: row.get(3)?,
                success_count: row.get(4)?,
                failure_count: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Problems that keep recurring without any solution clearing the
    /// given confidence floor.
    pub fn unsolved_recurring(
        &self,
        min_occurrences: u32,
        confidence_floor: f64,
        limit: usize,
    ) -> Result<Vec<ProblemRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, fingerprint, kind, description, signature, severity,
                    first_seen, last_seen, occurrence_count
             FROM problems p
             WHERE occurrence_count >= ?1
               AND NOT EXISTS (
                   SELECT 1 FROM solutions s
                   WHERE s.fingerprint = p.fingerprint AND s.confidence >= ?2
               )
             ORDER BY occurrence_count DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![min_occurrences, confidence_floor, limit as i64],
            row_to_problem,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Solutions whose confidence has decayed below the floor despite a
    /// real track record. Candidates for retirement.
    pub fn low_confidence_count(
        &self,
        confidence_floor: f64,
        min_attempts: u32,
    ) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM solutions
             WHERE confidence < ?1 AND success_count + failure_count >= ?2",
            params![confidence_floor, min_attempts],
            |row| row.get(0),
        )?;
        Ok(as_count(count))
    }

    /// SHARE_SOLUTION messages published in the last `days` days.
    pub fn recent_share_count(&self, days: u32) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_collaboration
             WHERE message_type = 'SHARE_SOLUTION'
               AND datetime(created_at) >= datetime('now', ?1)",
            params![format!("-{days} days")],
            |row| row.get(0),
        )?;
        Ok(as_count(count))
    }

    pub fn collaboration_stats(&self, agent_id: &str) -> Result<CollabStats, StoreError> {
        let conn = self.conn();
        let count = |status: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM agent_collaboration WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )
        };
        let pending = count("PENDING")?;
        let processed = count("PROCESSED")?;
        let failed = count("FAILED")?;
        let published_by_agent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_collaboration WHERE source_agent = ?1",
            params![agent_id],
            |row| row.get(0),
        )?;
        Ok(CollabStats {
            pending: as_count(pending),
            processed: as_count(processed),
            failed: as_count(failed),
            published_by_agent: as_count(published_by_agent),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::ConfidenceModel;
    use crate::{MessageType, NewProblem};

    struct RatioModel;

    impl ConfidenceModel for RatioModel {
        fn initial(&self, success: bool) -> f64 {
            if success { 1.0 } else { 0.1 }
        }

        fn recompute(&self, s: u32, f: u32) -> f64 {
            f64::from(s) / f64::from(s + f)
        }
    }

    fn seeded_store() -> KnowledgeStore {
        let store = KnowledgeStore::open_memory().unwrap();
        for (fp, kind, count) in [
            ("fp_mem", "HIGH_MEMORY", 5),
            ("fp_db", "DB_LOCKED", 2),
            ("fp_api", "API_DOWN", 1),
        ] {
            for _ in 0..count {
                store
                    .record_problem(&NewProblem {
                        fingerprint: fp,
                        kind,
                        description: kind,
                        signature: kind,
                        severity: "HIGH",
                    })
                    .unwrap();
            }
        }
        store
            .record_solution_outcome("fp_mem", "restart", "[\"wait:1\"]", true, "agent_a", &RatioModel)
            .unwrap();
        store
            .record_solution_outcome("fp_db", "retry", "[\"wait:5\"]", false, "agent_a", &RatioModel)
            .unwrap();
        store
    }

    #[test]
    fn test_problem_stats_counts() {
        let store = seeded_store();
        let stats = store.problem_stats(0.8).unwrap();
        assert_eq!(stats.total_problems, 3);
        assert_eq!(stats.total_occurrences, 8);
        assert_eq!(stats.total_solutions, 2);
        assert_eq!(stats.high_confidence_solutions, 1);
    }

    #[test]
    fn test_top_problems_ranked_by_occurrences() {
        let store = seeded_store();
        let top = store.top_problems(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].fingerprint, "fp_mem");
        assert_eq!(top[0].occurrence_count, 5);
        assert!((top[0].best_confidence.unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(top[1].best_confidence.is_some());
    }

    #[test]
    fn test_best_solutions_joins_problem_kind() {
        let store = seeded_store();
        let best = store.best_solutions(10).unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].problem_kind, "HIGH_MEMORY");
        assert!(best[0].confidence > best[1].confidence);
    }

    #[test]
    fn test_unsolved_recurring_excludes_solved() {
        let store = seeded_store();
        let unsolved = store.unsolved_recurring(2, 0.8, 10).unwrap();
        assert_eq!(unsolved.len(), 1);
        assert_eq!(unsolved[0].fingerprint, "fp_db");
    }

    #[test]
    fn test_low_confidence_and_recent_share_counts() {
        let store = seeded_store();
        store
            .publish_message("agent_a", None, MessageType::ShareSolution, "{}")
            .unwrap();
        assert_eq!(store.recent_share_count(7).unwrap(), 1);
        // fp_db's solution sits at 0.1 confidence after one real attempt.
        assert_eq!(store.low_confidence_count(0.5, 1).unwrap(), 1);
    }

    #[test]
    fn test_collaboration_stats() {
        let store = seeded_store();
        store
            .publish_message("agent_a", None, MessageType::ShareSolution, "{}")
            .unwrap();
        let id = store
            .publish_message("agent_b", None, MessageType::ShareSolution, "{}")
            .unwrap();
        store.mark_message_failed(id).unwrap();
        let stats = store.collaboration_stats("agent_a").unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published_by_agent, 1);
    }
}
