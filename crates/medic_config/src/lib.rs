//! medic_config - Configuration parsing and validation for Medic
//!
//! This crate provides:
//! - TOML config loading with sensible defaults
//! - Per-section config structs (agent, store, monitor, learning, alerts, housekeeping)
//! - Startup validation that fails fast on unusable values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MedicConfig {
    pub agent: AgentConfig,
    pub store: StoreConfig,
    pub monitor: MonitorConfig,
    pub learning: LearningConfig,
    pub alerts: AlertConfig,
    pub housekeeping: HousekeepingConfig,
}

/// Agent identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Unique identity of this agent instance, stamped on everything it creates
    pub id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "medic_24_7".to_string(),
        }
    }
}

/// Knowledge store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the shared SQLite knowledge database
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("knowledge.db"),
        }
    }
}

/// A monitored local service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, also the `restart_service:<name>` step argument
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// HTTP health endpoint; expects 200 when healthy
    pub health_url: Option<String>,
    /// Shell command that stops and restarts the service
    pub restart_cmd: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// An external API reachability check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub name: String,
    pub url: String,
}

/// Health monitor and scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between health check cycles
    pub poll_interval_secs: u64,
    /// Bounded timeout for each probe (HTTP, TCP, shell)
    pub probe_timeout_secs: u64,
    /// Settle delay after a restart attempt before re-probing
    pub settle_delay_secs: u64,
    /// Seconds between collaboration syncs
    pub sync_interval_secs: u64,
    pub services: Vec<ServiceConfig>,
    /// SQLite files whose integrity is checked as the "database" aggregate
    pub databases: Vec<PathBuf>,
    /// External endpoints checked as the "apis" aggregate
    pub apis: Vec<ApiEndpoint>,
    /// Secret files (env files, key material) that must stay owner-only
    pub secret_files: Vec<PathBuf>,
    /// Data files that must never be writable beyond their owner
    pub protected_files: Vec<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            probe_timeout_secs: 10,
            settle_delay_secs: 5,
            sync_interval_secs: 300,
            services: vec![],
            databases: vec![],
            apis: vec![],
            secret_files: vec![],
            protected_files: vec![],
        }
    }
}

/// Learner and sharing-gate policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Minimum confidence for a solution to be auto-applied
    pub auto_apply_threshold: f64,
    /// Learning bonus added once a solution has enough successes
    pub confidence_bonus: f64,
    /// Success count at which the bonus kicks in
    pub bonus_success_threshold: u32,
    /// Sharing gate: minimum confidence
    pub share_min_confidence: f64,
    /// Sharing gate: minimum success count
    pub share_min_successes: u32,
    /// Sharing gate: minimum total attempts
    pub share_min_attempts: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            auto_apply_threshold: 0.8,
            confidence_bonus: 0.1,
            bonus_success_threshold: 5,
            share_min_confidence: 0.9,
            share_min_successes: 3,
            share_min_attempts: 5,
        }
    }
}

/// Raw alert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Per-alert-kind cooldown window
    pub cooldown_secs: u64,
    /// Directory where alert JSON files are written
    pub dir: PathBuf,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            dir: data_dir().join("alerts"),
        }
    }
}

/// Daily housekeeping and remedy-step settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Directories pruned by log cleanup
    pub log_dirs: Vec<PathBuf>,
    /// Files older than this many days are pruned
    pub retention_days: u32,
    /// Files copied by the backup step and the daily backup task
    pub backup_files: Vec<PathBuf>,
    pub backup_dir: PathBuf,
    /// Directory where health snapshots and daily reports land
    pub report_dir: PathBuf,
    /// Hour of day (local) for the daily report
    pub report_hour: u32,
    /// Hour of day (local) for log cleanup
    pub cleanup_hour: u32,
    /// Hour of day (local) for the daily backup
    pub backup_hour: u32,
    /// check_disk_space fails below this free percentage
    pub min_free_disk_pct: f64,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            log_dirs: vec![data_dir().join("logs")],
            retention_days: 7,
            backup_files: vec![],
            backup_dir: data_dir().join("backups"),
            report_dir: data_dir().join("reports"),
            report_hour: 6,
            cleanup_hour: 2,
            backup_hour: 1,
            min_free_disk_pct: 10.0,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medic")
}

/// Default config file location: `<config_dir>/medic/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medic")
        .join("config.toml")
}

impl MedicConfig {
    /// Load from an explicit path, or the default location.
    ///
    /// A missing file at the default location yields the default config;
    /// a missing file at an explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::Invalid(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            info!("No config file found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let raw = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reject values the scheduler and learner cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.id.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.id must not be empty".into()));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.poll_interval_secs must be > 0".into(),
            ));
        }
        if self.monitor.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.probe_timeout_secs must be > 0".into(),
            ));
        }
        for bound in [
            ("learning.auto_apply_threshold", self.learning.auto_apply_threshold),
            ("learning.share_min_confidence", self.learning.share_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&bound.1) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1]",
                    bound.0
                )));
            }
        }
        if self.learning.confidence_bonus < 0.0 {
            return Err(ConfigError::Invalid(
                "learning.confidence_bonus must be >= 0".into(),
            ));
        }
        for hour in [
            ("housekeeping.report_hour", self.housekeeping.report_hour),
            ("housekeeping.cleanup_hour", self.housekeeping.cleanup_hour),
            ("housekeeping.backup_hour", self.housekeeping.backup_hour),
        ] {
            if hour.1 > 23 {
                return Err(ConfigError::Invalid(format!("{} must be 0-23", hour.0)));
            }
        }
        Ok(())
    }

    /// Look up a monitored service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.monitor.services.iter().find(|s| s.name == name)
    }
}
