//! Remedy execution: typed remediation steps and the sequential runner
//! that applies them to the live system.

pub mod housekeeping;
pub mod runner;
pub mod step;

pub use housekeeping::{backup_files, cleanup_old_files};
pub use runner::{ExecutionReport, RemedyContext, RemedyRunner, StepTrace};
pub use step::{Step, steps_from_json, steps_to_json};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemedyError {
    #[error("Invalid steps payload: {0}")]
    InvalidSteps(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
