//! The learning report: a periodic snapshot of what the agent knows,
//! what keeps hurting, and where the knowledge base is weak.

use crate::LearnError;
use medic_config::LearningConfig;
use medic_store::{BestSolution, CollabStats, KnowledgeStore, ProblemStats, TopProblem};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// How well the knowledge base covers the problems it has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmunityLevel {
    /// Under a quarter of known problems have a trusted solution
    Building,
    Developing,
    Strong,
    /// Three quarters or more are covered
    Robust,
}

impl ImmunityLevel {
    /// Coverage = problems with at least one trusted solution / all
    /// problems. An empty knowledge base is still Building.
    fn from_coverage(covered: u64, total: u64) -> Self {
        if total == 0 {
            return ImmunityLevel::Building;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = covered as f64 / total as f64;
        if ratio >= 0.75 {
            ImmunityLevel::Robust
        } else if ratio >= 0.5 {
            ImmunityLevel::Strong
        } else if ratio >= 0.25 {
            ImmunityLevel::Developing
        } else {
            ImmunityLevel::Building
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LearningReport {
    pub agent_id: String,
    pub generated_at: String,
    pub stats: ProblemStats,
    pub top_problems: Vec<TopProblem>,
    pub best_solutions: Vec<BestSolution>,
    pub collaboration: CollabStats,
    pub recommendations: Vec<String>,
    pub immunity: ImmunityLevel,
}

impl LearningReport {
    pub fn generate(
        store: &KnowledgeStore,
        agent_id: &str,
        config: &LearningConfig,
    ) -> Result<Self, LearnError> {
        let threshold = config.auto_apply_threshold;
        let stats = store.problem_stats(threshold)?;
        let top_problems = store.top_problems(10)?;
        let best_solutions = store.best_solutions(10)?;
        let collaboration = store.collaboration_stats(agent_id)?;
        let recommendations = recommendations(store, threshold)?;

        let covered = top_problems
            .iter()
            .filter(|p| p.best_confidence.is_some_and(|c| c >= threshold))
            .count() as u64;
        let immunity = ImmunityLevel::from_coverage(covered, top_problems.len() as u64);

        Ok(Self {
            agent_id: agent_id.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            stats,
            top_problems,
            best_solutions,
            collaboration,
            recommendations,
            immunity,
        })
    }

    /// Write the report as pretty JSON under `dir`, returning the path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, LearnError> {
        std::fs::create_dir_all(dir).map_err(medic_store::StoreError::IoError)?;
        let stamp = chrono::Utc::now().format("%Y%m%d");
        let path = dir.join(format!("learning_report_{stamp}.json"));
        let payload = serde_json::to_string_pretty(self)
            .map_err(medic_store::StoreError::SerializationError)?;
        std::fs::write(&path, payload).map_err(medic_store::StoreError::IoError)?;
        info!(path = %path.display(), "Wrote learning report");
        Ok(path)
    }
}

fn recommendations(store: &KnowledgeStore, threshold: f64) -> Result<Vec<String>, LearnError> {
    let mut recs = Vec::new();

    for problem in store.unsolved_recurring(5, threshold, 5)? {
        recs.push(format!(
            "Focus on solving '{}' - occurs {} times but no reliable solution found",
            problem.kind, problem.occurrence_count
        ));
    }

    let low_confidence = store.low_confidence_count(0.5, 3)?;
    if low_confidence > 0 {
        recs.push(format!(
            "Review {low_confidence} low-confidence solutions for improvement opportunities"
        ));
    }

    if store.recent_share_count(7)? == 0 {
        recs.push(
            "No recent solution sharing detected - consider increasing collaboration with other agents"
                .to_string(),
        );
    }

    if recs.is_empty() {
        recs.push("Learning system is performing well - continue current practices".to_string());
    }
    Ok(recs)
}
