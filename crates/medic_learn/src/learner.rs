//! Outcome recording and the auto-apply path.

use crate::LearnError;
use crate::policy::ConfidencePolicy;
use medic_collab::{CollabBus, SharingGate};
use medic_config::LearningConfig;
use medic_remedy::{ExecutionReport, RemedyRunner, Step, steps_from_json, steps_to_json};
use medic_store::{EventType, KnowledgeStore, SolutionRow};
use tracing::info;

/// Result of auto-applying the best known solution.
#[derive(Debug)]
pub struct ApplyOutcome {
    /// The solution row after its confidence was updated with this run
    pub solution: SolutionRow,
    pub report: ExecutionReport,
}

pub struct Learner {
    store: KnowledgeStore,
    agent_id: String,
    policy: ConfidencePolicy,
    auto_apply_threshold: f64,
    bus: CollabBus,
    runner: RemedyRunner,
}

impl Learner {
    pub fn new(
        store: KnowledgeStore,
        config: &LearningConfig,
        agent_id: impl Into<String>,
        runner: RemedyRunner,
    ) -> Self {
        let agent_id = agent_id.into();
        let bus = CollabBus::new(
            store.clone(),
            agent_id.clone(),
            SharingGate::from_config(config),
        );
        Self {
            store,
            agent_id,
            policy: ConfidencePolicy::from_config(config),
            auto_apply_threshold: config.auto_apply_threshold,
            bus,
            runner,
        }
    }

    /// Record one attempt of `steps` against `fingerprint` and update
    /// confidence. Successful attempts are offered to the sharing gate.
    pub fn record_outcome(
        &self,
        fingerprint: &str,
        description: &str,
        steps: &[Step],
        success: bool,
    ) -> Result<SolutionRow, LearnError> {
        let steps_json = steps_to_json(steps);
        let row = self.store.record_solution_outcome(
            fingerprint,
            description,
            &steps_json,
            success,
            &self.agent_id,
            &self.policy,
        )?;

        let detail = format!("Solution applied: {description} - success: {success}");
        self.store.log_event(
            &self.agent_id,
            EventType::SolutionApplied,
            Some(fingerprint),
            Some(row.id),
            success,
            &detail,
        )?;

        info!(
            fingerprint = %&fingerprint[..fingerprint.len().min(8)],
            solution_id = row.id,
            success,
            confidence = row.confidence,
            "Recorded solution outcome"
        );

        if success {
            self.bus.maybe_share(&row)?;
        }
        Ok(row)
    }

    /// Highest-confidence solution clearing the auto-apply threshold.
    pub fn best_solution(&self, fingerprint: &str) -> Result<Option<SolutionRow>, LearnError> {
        Ok(self
            .store
            .best_solution(fingerprint, self.auto_apply_threshold)?)
    }

    /// Auto-resolution: run the best trusted solution, feed the result
    /// back into confidence. `None` means no solution clears the gate and
    /// the problem remains a challenge.
    pub async fn apply_best(&self, fingerprint: &str) -> Result<Option<ApplyOutcome>, LearnError> {
        let Some(solution) = self.best_solution(fingerprint)? else {
            return Ok(None);
        };
        let steps = steps_from_json(&solution.steps_json)?;

        info!(
            fingerprint = %&fingerprint[..fingerprint.len().min(8)],
            solution_id = solution.id,
            confidence = solution.confidence,
            "Auto-applying learned solution"
        );
        let report = self.runner.execute(&steps).await;
        let updated =
            self.record_outcome(fingerprint, &solution.description, &steps, report.success)?;
        Ok(Some(ApplyOutcome {
            solution: updated,
            report,
        }))
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}
