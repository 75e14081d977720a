//! The analyzer: fingerprints incoming faults and records them.

use crate::normalize::{fingerprint, signature};
use crate::severity::{affects_trading, assess_severity, component_for_kind};
use crate::TriageError;
use medic_store::{EventType, KnowledgeStore, NewProblem, ProblemRow};
use tracing::info;

/// Where a fault was observed. Feeds both the fingerprint and the
/// severity policy.
#[derive(Debug, Clone, Default)]
pub struct ProblemContext {
    pub component: String,
    pub operation: String,
    pub affects_trading: bool,
}

impl ProblemContext {
    /// Context derived from the problem kind alone, the way monitor-raised
    /// alerts carry it.
    pub fn for_kind(kind: &str, operation: &str) -> Self {
        Self {
            component: component_for_kind(kind).to_string(),
            operation: operation.to_string(),
            affects_trading: affects_trading(kind),
        }
    }
}

/// Fingerprints faults and upserts them into the knowledge store.
pub struct Analyzer {
    store: KnowledgeStore,
    agent_id: String,
}

impl Analyzer {
    pub fn new(store: KnowledgeStore, agent_id: impl Into<String>) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
        }
    }

    /// Analyze a fault and return its fingerprint along with the stored
    /// row. Store failures propagate; a dropped problem is lost history.
    pub fn analyze(
        &self,
        kind: &str,
        raw_message: &str,
        context: &ProblemContext,
    ) -> Result<ProblemRow, TriageError> {
        let sig = signature(kind, raw_message, &context.component, &context.operation);
        let fp = fingerprint(&sig);
        let severity = assess_severity(kind, &context.component, context.affects_trading);

        let row = self.store.record_problem(&NewProblem {
            fingerprint: &fp,
            kind,
            description: raw_message,
            signature: &sig,
            severity: severity.as_str(),
        })?;

        let detail = format!("Problem: {} - {:.100}", kind, raw_message);
        self.store.log_event(
            &self.agent_id,
            EventType::ProblemDetected,
            Some(&fp),
            None,
            true,
            &detail,
        )?;

        info!(
            fingerprint = %&fp[..8],
            kind,
            severity = %severity,
            count = row.occurrence_count,
            "Problem analyzed"
        );
        Ok(row)
    }
}
