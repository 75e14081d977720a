//! Common test utilities for medic integration tests.
//!
//! This module provides:
//! - Tracing initialization for test output
//! - Test configuration builders scoped to a temp directory

use std::path::Path;
use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize tracing once for integration tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    });
}

/// Build a default config with every writable path under `dir`.
pub fn temp_config(dir: &Path) -> medic_config::MedicConfig {
    let mut config = medic_config::MedicConfig::default();
    config.store.path = dir.join("medic.db");
    config.alerts.dir = dir.join("alerts");
    config.housekeeping.report_dir = dir.join("reports");
    config.housekeeping.backup_dir = dir.join("backups");
    config
}

/// Open a fresh knowledge store at the config's path.
pub fn open_store(config: &medic_config::MedicConfig) -> medic_store::KnowledgeStore {
    medic_store::KnowledgeStore::open(&config.store.path).unwrap()
}
