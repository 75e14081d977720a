//! Problem triage: normalize raw error text into a stable fingerprint,
//! classify severity, and record the occurrence.

pub mod analyzer;
pub mod normalize;
pub mod severity;

pub use analyzer::{Analyzer, ProblemContext};
pub use normalize::{fingerprint, normalize_message, signature};
pub use severity::{Severity, affects_trading, assess_severity, component_for_kind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    /// Losing problem history defeats the learning purpose, so store
    /// failures surface instead of being swallowed.
    #[error("Knowledge store error: {0}")]
    StoreError(#[from] medic_store::StoreError),
}
