//! The health monitor: a perpetual loop that probes services, databases,
//! external APIs and host vitals, raises what it finds into the triage
//! and learning pipeline, and runs the daily housekeeping tasks.

pub mod health;
pub mod monitor;
pub mod scheduler;
pub mod tasks;

pub use health::{ComponentHealth, HealthSnapshot, HealthState};
pub use monitor::Monitor;
pub use scheduler::Scheduler;
pub use tasks::DailyTasks;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Knowledge store error: {0}")]
    StoreError(#[from] medic_store::StoreError),

    #[error("Triage error: {0}")]
    TriageError(#[from] medic_triage::TriageError),

    #[error("Learner error: {0}")]
    LearnError(#[from] medic_learn::LearnError),

    #[error("Collaboration error: {0}")]
    CollabError(#[from] medic_collab::CollabError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
