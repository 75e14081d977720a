//! Typed remediation steps.
//!
//! On disk a step is the string `verb:argument`; in the program it is a
//! variant, so dispatch is a match instead of prefix tests. Parsing never
//! fails: an unrecognized verb becomes `Unknown`, which executes as a
//! failed step rather than an error.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    RestartService(String),
    /// Sleep for N seconds before the next step
    Wait(u64),
    /// Succeeds when something is listening on the port. Out-of-range
    /// values parse fine and fail at execution time.
    CheckPort(u32),
    CleanupLogs,
    BackupDatabase,
    CheckDiskSpace,
    Unknown(String),
}

impl Step {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (verb, arg) = match raw.split_once(':') {
            Some((v, a)) => (v, Some(a)),
            None => (raw, None),
        };
        match (verb, arg) {
            ("restart_service", Some(service)) if !service.is_empty() => {
                Step::RestartService(service.to_string())
            }
            ("wait", Some(secs)) => match secs.parse() {
                Ok(n) => Step::Wait(n),
                Err(_) => Step::Unknown(raw.to_string()),
            },
            ("check_port", Some(port)) => match port.parse() {
                Ok(n) => Step::CheckPort(n),
                Err(_) => Step::Unknown(raw.to_string()),
            },
            ("cleanup_logs", None) => Step::CleanupLogs,
            ("backup_database", None) => Step::BackupDatabase,
            ("check_disk_space", None) => Step::CheckDiskSpace,
            _ => Step::Unknown(raw.to_string()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::RestartService(service) => write!(f, "restart_service:{service}"),
            Step::Wait(secs) => write!(f, "wait:{secs}"),
            Step::CheckPort(port) => write!(f, "check_port:{port}"),
            Step::CleanupLogs => f.write_str("cleanup_logs"),
            Step::BackupDatabase => f.write_str("backup_database"),
            Step::CheckDiskSpace => f.write_str("check_disk_space"),
            Step::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Step::parse(&raw))
    }
}

/// Canonical JSON array of step strings, the on-disk format.
pub fn steps_to_json(steps: &[Step]) -> String {
    serde_json::to_string(steps).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a stored steps payload. Unknown verbs survive as `Unknown`;
/// a payload that is not a JSON string array is an error.
pub fn steps_from_json(json: &str) -> Result<Vec<Step>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        _ => Err(serde_json::Error::custom("steps payload must be an array")),
    }
}
