//! The collaboration bus: agents sharing a knowledge store exchange
//! proven solutions through the message table.
//!
//! Sharing is gated hard so the bus carries only battle-tested remedies;
//! importing seeds a moderate-confidence placeholder that must earn local
//! trust before it can be auto-applied.

use medic_config::LearningConfig;
use medic_store::{
    ImportOutcome, ImportSeed, KnowledgeStore, MessageType, SolutionRow, StoreError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Knowledge store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Payload of a SHARE_SOLUTION message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareContent {
    pub fingerprint: String,
    pub solution_id: i64,
    pub description: String,
    pub shared_by: String,
    pub timestamp: String,
}

/// Publication gate. All three floors must hold.
#[derive(Debug, Clone, Copy)]
pub struct SharingGate {
    pub min_confidence: f64,
    pub min_successes: u32,
    pub min_attempts: u32,
}

impl SharingGate {
    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            min_confidence: config.share_min_confidence,
            min_successes: config.share_min_successes,
            min_attempts: config.share_min_attempts,
        }
    }

    pub fn should_share(&self, solution: &SolutionRow) -> bool {
        solution.confidence >= self.min_confidence
            && solution.success_count >= self.min_successes
            && solution.total_attempts() >= self.min_attempts
    }
}

/// Outcome counters for one sync pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct CollabBus {
    store: KnowledgeStore,
    agent_id: String,
    gate: SharingGate,
}

impl CollabBus {
    pub fn new(store: KnowledgeStore, agent_id: impl Into<String>, gate: SharingGate) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
            gate,
        }
    }

    /// Publish the solution if it clears the gate. Returns whether it
    /// was published.
    pub fn maybe_share(&self, solution: &SolutionRow) -> Result<bool, CollabError> {
        if !self.gate.should_share(solution) {
            return Ok(false);
        }
        self.publish(solution)?;
        Ok(true)
    }

    pub fn publish(&self, solution: &SolutionRow) -> Result<i64, CollabError> {
        let content = ShareContent {
            fingerprint: solution.fingerprint.clone(),
            solution_id: solution.id,
            description: solution.description.clone(),
            shared_by: self.agent_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_string(&content).map_err(StoreError::SerializationError)?;
        let id = self.store.publish_message(
            &self.agent_id,
            None,
            MessageType::ShareSolution,
            &payload,
        )?;
        info!(
            solution_id = solution.id,
            fingerprint = %&solution.fingerprint[..solution.fingerprint.len().min(8)],
            "Shared solution with other agents"
        );
        Ok(id)
    }

    /// One sync pass: consume every pending SHARE_SOLUTION message from
    /// other agents. Malformed or unimportable messages go to FAILED so
    /// they are never rescanned.
    pub fn sync(&self) -> Result<SyncSummary, CollabError> {
        let mut summary = SyncSummary::default();

        for msg in self.store.pending_share_messages(&self.agent_id)? {
            let content: ShareContent = match serde_json::from_str(&msg.content) {
                Ok(c) => c,
                Err(e) => {
                    warn!(message_id = msg.id, error = %e, "Malformed share message");
                    self.store.mark_message_failed(msg.id)?;
                    summary.failed += 1;
                    continue;
                }
            };

            match self.store.import_shared_solution(
                msg.id,
                &content.fingerprint,
                &content.description,
                &msg.source_agent,
                &self.agent_id,
                &ImportSeed::default(),
            ) {
                Ok(ImportOutcome::Imported(_)) => summary.imported += 1,
                Ok(ImportOutcome::AlreadyKnown | ImportOutcome::NotPending) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(message_id = msg.id, error = %e, "Import failed");
                    self.store.mark_message_failed(msg.id)?;
                    summary.failed += 1;
                }
            }
        }
        if summary.imported > 0 {
            info!(
                imported = summary.imported,
                skipped = summary.skipped,
                failed = summary.failed,
                "Collaboration sync finished"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medic_store::{ConfidenceModel, NewProblem};

    struct RatioModel;

    impl ConfidenceModel for RatioModel {
        fn initial(&self, success: bool) -> f64 {
            if success { 1.0 } else { 0.1 }
        }

        fn recompute(&self, s: u32, f: u32) -> f64 {
            f64::from(s) / f64::from(s + f)
        }
    }

    fn gate() -> SharingGate {
        SharingGate::from_config(&LearningConfig::default())
    }

    fn store_with_problem(fingerprint: &str) -> KnowledgeStore {
        let store = KnowledgeStore::open_memory().unwrap();
        store
            .record_problem(&NewProblem {
                fingerprint,
                kind: "BACKEND_DOWN",
                description: "backend not responding",
                signature: "sig",
                severity: "CRITICAL",
            })
            .unwrap();
        store
    }

    fn proven_solution(store: &KnowledgeStore, agent: &str) -> SolutionRow {
        let mut row = store
            .record_solution_outcome("fp1", "restart backend", "[\"restart_service:backend\"]", true, agent, &RatioModel)
            .unwrap();
        for _ in 0..4 {
            row = store
                .record_solution_outcome("fp1", "restart backend", "[\"restart_service:backend\"]", true, agent, &RatioModel)
                .unwrap();
        }
        row
    }

    #[test]
    fn test_gate_requires_all_three_floors() {
        let gate = gate();
        let store = store_with_problem("fp1");
        let proven = proven_solution(&store, "agent_a");
        assert!(gate.should_share(&proven));

        // 3 successes out of 3: confidence and successes fine, attempts short.
        let mut young = proven.clone();
        young.success_count = 3;
        young.failure_count = 0;
        assert!(!gate.should_share(&young));

        let mut shaky = proven;
        shaky.confidence = 0.85;
        assert!(!gate.should_share(&shaky));
    }

    #[test]
    fn test_publish_payload_carries_provenance() {
        let store = store_with_problem("fp1");
        let solution = proven_solution(&store, "agent_a");
        let bus = CollabBus::new(store.clone(), "agent_a", gate());
        let id = bus.publish(&solution).unwrap();

        let msg = store.message(id).unwrap().unwrap();
        let content: ShareContent = serde_json::from_str(&msg.content).unwrap();
        assert_eq!(content.fingerprint, "fp1");
        assert_eq!(content.shared_by, "agent_a");
        assert_eq!(content.solution_id, solution.id);
    }

    #[test]
    fn test_sync_skips_own_messages_and_imports_others() {
        let store = store_with_problem("fp1");
        let solution = proven_solution(&store, "agent_a");
        let bus_a = CollabBus::new(store.clone(), "agent_a", gate());
        bus_a.publish(&solution).unwrap();

        // The author sees nothing to do.
        let own = bus_a.sync().unwrap();
        assert_eq!(own.imported, 0);

        let bus_b = CollabBus::new(store.clone(), "agent_b", gate());
        let first = bus_b.sync().unwrap();
        assert_eq!(first.imported, 1);

        let imported = store
            .solutions_for("fp1")
            .unwrap()
            .into_iter()
            .find(|s| s.created_by == "imported_from_agent_a")
            .unwrap();
        assert!((imported.confidence - 0.5).abs() < f64::EPSILON);

        // Re-publishing the same solution does not duplicate the import.
        bus_a.publish(&solution).unwrap();
        let second = bus_b.sync().unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn test_malformed_message_goes_to_failed() {
        let store = store_with_problem("fp1");
        let id = store
            .publish_message("agent_a", None, MessageType::ShareSolution, "not json")
            .unwrap();
        let bus = CollabBus::new(store.clone(), "agent_b", gate());

        let summary = bus.sync().unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(
            store.message(id).unwrap().unwrap().status,
            medic_store::MessageStatus::Failed
        );

        // FAILED messages are never rescanned.
        let again = bus.sync().unwrap();
        assert_eq!(again.failed, 0);
    }

    #[test]
    fn test_import_for_unknown_problem_fails_message() {
        let store = store_with_problem("fp1");
        let content = ShareContent {
            fingerprint: "fp_nobody_has".into(),
            solution_id: 1,
            description: "mystery fix".into(),
            shared_by: "agent_a".into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let id = store
            .publish_message(
                "agent_a",
                None,
                MessageType::ShareSolution,
                &serde_json::to_string(&content).unwrap(),
            )
            .unwrap();

        let bus = CollabBus::new(store.clone(), "agent_b", gate());
        let summary = bus.sync().unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(
            store.message(id).unwrap().unwrap().status,
            medic_store::MessageStatus::Failed
        );
    }
}
