//! The learner: turns remedy outcomes into confidence and decides when a
//! solution is trusted enough to auto-apply or share.

pub mod learner;
pub mod policy;
pub mod report;

pub use learner::{ApplyOutcome, Learner};
pub use policy::ConfidencePolicy;
pub use report::{ImmunityLevel, LearningReport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnError {
    #[error("Knowledge store error: {0}")]
    StoreError(#[from] medic_store::StoreError),

    #[error("Collaboration error: {0}")]
    CollabError(#[from] medic_collab::CollabError),

    #[error("Stored solution has invalid steps: {0}")]
    InvalidSteps(#[from] serde_json::Error),
}
