//! medic_alert - Alert delivery with per-kind cooldowns
//!
//! This crate provides:
//! - The fired-alert type and delivery channel trait
//! - A sink that fans out to channels, suppressing repeats per kind
//! - Built-in channels: tracing log lines and JSON files on disk

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use medic_config::AlertConfig;
use medic_triage::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A fired alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Problem kind, also the cooldown key (`HIGH_MEMORY`, `BACKEND_DOWN`, ...)
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub fired_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity,
            message: message.into(),
            fired_at: Utc::now(),
        }
    }
}

/// Alert delivery channel trait
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Fans alerts out to channels with a per-kind cooldown so a flapping
/// check cannot flood every channel each poll cycle.
pub struct AlertSink {
    channels: Vec<Box<dyn AlertChannel>>,
    cooldowns: DashMap<String, Instant>,
    cooldown: Duration,
}

impl AlertSink {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            channels: Vec::new(),
            cooldowns: DashMap::new(),
            cooldown,
        }
    }

    /// Sink with the default channels for `config`: tracing plus JSON
    /// files under the alert directory.
    pub fn from_config(config: &AlertConfig) -> Self {
        let mut sink = Self::new(Duration::from_secs(config.cooldown_secs));
        sink.add_channel(Box::new(TracingChannel));
        sink.add_channel(Box::new(FileChannel::new(config.dir.clone())));
        sink
    }

    pub fn add_channel(&mut self, channel: Box<dyn AlertChannel>) {
        self.channels.push(channel);
    }

    pub fn is_in_cooldown(&self, kind: &str) -> bool {
        self.cooldowns
            .get(kind)
            .is_some_and(|last| last.elapsed() < self.cooldown)
    }

    /// Deliver to every channel unless the kind is cooling down.
    /// Returns whether the alert went out. A channel failure is logged
    /// and does not stop the remaining channels.
    pub async fn raise(&self, alert: &Alert) -> bool {
        if self.is_in_cooldown(&alert.kind) {
            return false;
        }
        self.cooldowns.insert(alert.kind.clone(), Instant::now());

        for channel in &self.channels {
            if let Err(e) = channel.deliver(alert).await {
                error!(channel = channel.name(), error = %e, "Alert delivery failed");
            }
        }
        true
    }
}

/// Writes alerts to the log at a level matching their severity.
pub struct TracingChannel;

#[async_trait]
impl AlertChannel for TracingChannel {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        match alert.severity {
            Severity::Critical | Severity::High => {
                error!(kind = %alert.kind, severity = %alert.severity, "{}", alert.message);
            }
            Severity::Warning => {
                warn!(kind = %alert.kind, severity = %alert.severity, "{}", alert.message);
            }
            Severity::Medium | Severity::Low => {
                info!(kind = %alert.kind, severity = %alert.severity, "{}", alert.message);
            }
        }
        Ok(())
    }
}

/// Drops one JSON file per alert into a directory, for operators who
/// tail a folder instead of a log stream.
pub struct FileChannel {
    dir: PathBuf,
}

impl FileChannel {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl AlertChannel for FileChannel {
    fn name(&self) -> &str {
        "file"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let stamp = alert.fired_at.format("%Y%m%d_%H%M%S_%f");
        let path = self.dir.join(format!("alert_{stamp}.json"));
        let payload = serde_json::to_string_pretty(alert)
            .map_err(|e| AlertError::DeliveryFailed(e.to_string()))?;
        tokio::fs::write(&path, payload).await?;
        Ok(())
    }
}
