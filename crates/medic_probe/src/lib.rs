//! Low-level health probes: TCP ports, HTTP endpoints, SQLite files,
//! host vitals, and local command execution.
//!
//! Probes report findings, they never decide what a finding means. Turning
//! an unreachable port into a problem record is the monitor's job.

pub mod db;
pub mod executor;
pub mod net;
pub mod perms;
pub mod vitals;

pub use db::{SqliteHealth, sqlite_check};
pub use executor::{CommandOutput, Executor};
pub use net::{HttpHealth, check_port, http_health};
pub use perms::{DENY_ANY_ACCESS, DENY_WRITE, FileExposure, file_exposure};
pub use vitals::{Vitals, VitalsSampler, disk_free_pct};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Command execution failed: {0}")]
    ExecutionError(String),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}
