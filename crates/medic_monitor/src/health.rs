//! Health states and the immutable per-cycle snapshot.

use medic_probe::Vitals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    Unknown,
    Healthy,
    Degraded,
    Critical,
    Down,
    /// The check itself failed, which says nothing about the target
    Error,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Unknown => "UNKNOWN",
            HealthState::Healthy => "HEALTHY",
            HealthState::Degraded => "DEGRADED",
            HealthState::Critical => "CRITICAL",
            HealthState::Down => "DOWN",
            HealthState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Worst-wins rollup over component states.
pub fn overall_status(states: &[HealthState]) -> HealthState {
    if states
        .iter()
        .any(|s| matches!(s, HealthState::Critical | HealthState::Down))
    {
        HealthState::Critical
    } else if states
        .iter()
        .any(|s| matches!(s, HealthState::Degraded | HealthState::Error))
    {
        HealthState::Degraded
    } else if !states.is_empty() && states.iter().all(|s| *s == HealthState::Healthy) {
        HealthState::Healthy
    } else {
        HealthState::Unknown
    }
}

/// One checked component with an optional human-readable detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, state: HealthState) -> Self {
        Self {
            name: name.into(),
            state,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Immutable result of one full check cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub checked_at: String,
    pub overall: HealthState,
    pub services: Vec<ComponentHealth>,
    pub database: ComponentHealth,
    pub apis: ComponentHealth,
    pub security: ComponentHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
}

impl HealthSnapshot {
    /// Build a snapshot, computing the overall rollup from the parts.
    pub fn assemble(
        services: Vec<ComponentHealth>,
        database: ComponentHealth,
        apis: ComponentHealth,
        security: ComponentHealth,
        vitals: Option<Vitals>,
    ) -> Self {
        let mut states: Vec<HealthState> = services.iter().map(|s| s.state).collect();
        states.push(database.state);
        states.push(apis.state);
        states.push(security.state);
        Self {
            checked_at: chrono::Utc::now().to_rfc3339(),
            overall: overall_status(&states),
            services,
            database,
            apis,
            security,
            vitals,
        }
    }

    /// Persist as `health_snapshot_<stamp>.json` under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, crate::MonitorError> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M");
        let path = dir.join(format!("health_snapshot_{stamp}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved health snapshot");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_worst_wins() {
        use HealthState::{Critical, Degraded, Down, Error, Healthy, Unknown};
        assert_eq!(overall_status(&[Healthy, Healthy]), Healthy);
        assert_eq!(overall_status(&[Healthy, Degraded]), Degraded);
        assert_eq!(overall_status(&[Healthy, Error]), Degraded);
        assert_eq!(overall_status(&[Degraded, Down]), Critical);
        assert_eq!(overall_status(&[Healthy, Critical]), Critical);
        assert_eq!(overall_status(&[Healthy, Unknown]), Unknown);
        assert_eq!(overall_status(&[]), Unknown);
    }

    #[test]
    fn test_assemble_rolls_up_components() {
        let snapshot = HealthSnapshot::assemble(
            vec![
                ComponentHealth::new("backend", HealthState::Healthy),
                ComponentHealth::new("frontend", HealthState::Down).with_detail("port closed"),
            ],
            ComponentHealth::new("database", HealthState::Healthy),
            ComponentHealth::new("apis", HealthState::Healthy),
            ComponentHealth::new("security", HealthState::Healthy),
            None,
        );
        assert_eq!(snapshot.overall, HealthState::Critical);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let snapshot = HealthSnapshot::assemble(
            vec![ComponentHealth::new("backend", HealthState::Healthy)],
            ComponentHealth::new("database", HealthState::Degraded).with_detail("2/3 healthy"),
            ComponentHealth::new("apis", HealthState::Healthy),
            ComponentHealth::new("security", HealthState::Healthy),
            None,
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"DEGRADED\""));
        let back: HealthSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.overall, snapshot.overall);
    }

    #[test]
    fn test_write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = HealthSnapshot::assemble(
            vec![],
            ComponentHealth::new("database", HealthState::Unknown),
            ComponentHealth::new("apis", HealthState::Unknown),
            ComponentHealth::new("security", HealthState::Unknown),
            None,
        );
        let path = snapshot.write_to(dir.path()).unwrap();
        assert!(path.exists());
    }
}
