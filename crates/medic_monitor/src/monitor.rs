//! One check cycle: probe everything, raise what hurts.
//!
//! The raise path is the system's core loop: fingerprint the symptom,
//! try the best learned solution, and only bother a human (via alert and
//! challenge event) when no trusted remedy exists or the remedy failed.

use crate::health::{ComponentHealth, HealthSnapshot, HealthState};
use crate::MonitorError;
use medic_alert::{Alert, AlertSink};
use medic_config::MedicConfig;
use medic_learn::Learner;
use medic_probe::{
    DENY_ANY_ACCESS, DENY_WRITE, FileExposure, HttpHealth, SqliteHealth, Vitals, VitalsSampler,
    check_port, file_exposure, http_health, sqlite_check,
};
use medic_remedy::{RemedyContext, RemedyRunner};
use medic_store::{EventType, KnowledgeStore};
use medic_triage::{Analyzer, ProblemContext, assess_severity};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

pub struct Monitor {
    config: MedicConfig,
    store: KnowledgeStore,
    analyzer: Analyzer,
    learner: Learner,
    sink: AlertSink,
    client: reqwest::Client,
    sampler: Mutex<VitalsSampler>,
}

impl Monitor {
    pub fn new(config: MedicConfig, store: KnowledgeStore) -> Self {
        let agent_id = config.agent.id.clone();
        let runner = RemedyRunner::new(RemedyContext {
            services: config.monitor.services.clone(),
            housekeeping: config.housekeeping.clone(),
            probe_timeout: Duration::from_secs(config.monitor.probe_timeout_secs),
        });
        Self {
            analyzer: Analyzer::new(store.clone(), agent_id.clone()),
            learner: Learner::new(store.clone(), &config.learning, agent_id, runner),
            sink: AlertSink::from_config(&config.alerts),
            client: reqwest::Client::new(),
            sampler: Mutex::new(VitalsSampler::new()),
            config,
            store,
        }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn config(&self) -> &MedicConfig {
        &self.config
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.config.monitor.probe_timeout_secs)
    }

    /// Run every check once and persist the snapshot.
    pub async fn run_cycle(&self) -> Result<HealthSnapshot, MonitorError> {
        let vitals = self.check_vitals().await?;

        let mut services = Vec::with_capacity(self.config.monitor.services.len());
        for service in &self.config.monitor.services {
            services.push(self.check_service(&service.name).await?);
        }
        let database = self.check_databases().await?;
        let apis = self.check_apis().await?;
        let security = self.check_security().await?;

        let snapshot = HealthSnapshot::assemble(services, database, apis, security, Some(vitals));
        info!(overall = %snapshot.overall, "Health check cycle complete");
        snapshot.write_to(&self.config.housekeeping.report_dir)?;
        Ok(snapshot)
    }

    /// Fingerprint a symptom and try to heal it. Alerts only when no
    /// trusted solution exists or the solution failed.
    pub async fn raise_problem(
        &self,
        kind: &str,
        message: &str,
        operation: &str,
    ) -> Result<(), MonitorError> {
        let context = ProblemContext::for_kind(kind, operation);
        let problem = self.analyzer.analyze(kind, message, &context)?;

        match self.learner.apply_best(&problem.fingerprint).await? {
            Some(outcome) if outcome.report.success => {
                info!(
                    kind,
                    solution_id = outcome.solution.id,
                    "Problem auto-resolved with learned solution"
                );
                return Ok(());
            }
            Some(outcome) => {
                warn!(
                    kind,
                    solution_id = outcome.solution.id,
                    "Learned solution failed, escalating"
                );
            }
            None => {
                // A challenge: nothing trusted to try, needs teaching.
                let detail = format!("No trusted solution for {kind}: {message}");
                self.store.log_event(
                    &self.config.agent.id,
                    EventType::ChallengeDocumented,
                    Some(&problem.fingerprint),
                    None,
                    false,
                    &detail,
                )?;
            }
        }

        let severity = assess_severity(kind, &context.component, context.affects_trading);
        self.sink.raise(&Alert::new(kind, severity, message)).await;
        Ok(())
    }

    /// Port probe, one restart attempt, settle, re-probe, then the HTTP
    /// health endpoint if one is configured.
    pub async fn check_service(&self, name: &str) -> Result<ComponentHealth, MonitorError> {
        let Some(service) = self.config.service(name).cloned() else {
            return Ok(ComponentHealth::new(name, HealthState::Unknown)
                .with_detail("not configured"));
        };
        let timeout = self.probe_timeout();

        let mut port_open = check_port(&service.host, service.port, timeout).await;
        if !port_open && service.restart_cmd.is_some() {
            warn!(service = name, "Service not responding, attempting restart");
            self.raise_problem(
                &down_kind(name),
                &format!("Service {name} is not listening on port {}", service.port),
                "health_check",
            )
            .await?;
            tokio::time::sleep(Duration::from_secs(self.config.monitor.settle_delay_secs)).await;
            port_open = check_port(&service.host, service.port, timeout).await;
        }

        if !port_open {
            self.raise_problem(
                &down_kind(name),
                &format!("Service {name} is down on port {}", service.port),
                "health_check",
            )
            .await?;
            return Ok(ComponentHealth::new(name, HealthState::Down)
                .with_detail(format!("port {} closed", service.port)));
        }

        let Some(url) = &service.health_url else {
            return Ok(ComponentHealth::new(name, HealthState::Healthy));
        };
        let health = match http_health(&self.client, url, timeout).await {
            HttpHealth::Healthy { .. } => ComponentHealth::new(name, HealthState::Healthy),
            HttpHealth::Degraded { status } => {
                self.raise_problem(
                    &unhealthy_kind(name),
                    &format!("Service {name} health endpoint returned {status}"),
                    "health_check",
                )
                .await?;
                ComponentHealth::new(name, HealthState::Degraded)
                    .with_detail(format!("health endpoint returned {status}"))
            }
            HttpHealth::Unreachable { reason } => {
                // Port answers but the app does not: worse than degraded.
                self.raise_problem(
                    &down_kind(name),
                    &format!("Service {name} health endpoint unreachable: {reason}"),
                    "health_check",
                )
                .await?;
                ComponentHealth::new(name, HealthState::Critical).with_detail(reason)
            }
        };
        Ok(health)
    }

    /// Integrity-check every configured SQLite file. All healthy is
    /// HEALTHY, a strict majority is DEGRADED, a tie or worse is
    /// CRITICAL.
    pub async fn check_databases(&self) -> Result<ComponentHealth, MonitorError> {
        let paths = self.config.monitor.databases.clone();
        if paths.is_empty() {
            return Ok(ComponentHealth::new("database", HealthState::Unknown));
        }
        let total = paths.len();

        let results = tokio::task::spawn_blocking(move || {
            paths
                .iter()
                .map(|p| (p.clone(), sqlite_check(p)))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

        let healthy = results
            .iter()
            .filter(|(_, h)| matches!(h, SqliteHealth::Healthy { .. }))
            .count();

        let state = if healthy == total {
            HealthState::Healthy
        } else if healthy * 2 > total {
            HealthState::Degraded
        } else {
            HealthState::Critical
        };

        if state == HealthState::Critical {
            self.raise_problem(
                "DATABASE_CRITICAL",
                &format!("Only {healthy}/{total} databases healthy"),
                "database_check",
            )
            .await?;
        }
        Ok(ComponentHealth::new("database", state)
            .with_detail(format!("{healthy}/{total} healthy")))
    }

    /// Probe each external API; only a strict majority reachable keeps
    /// the aggregate out of CRITICAL.
    pub async fn check_apis(&self) -> Result<ComponentHealth, MonitorError> {
        let apis = &self.config.monitor.apis;
        if apis.is_empty() {
            return Ok(ComponentHealth::new("apis", HealthState::Unknown));
        }
        let timeout = self.probe_timeout();
        let total = apis.len();
        let mut healthy = 0;

        for api in apis {
            if matches!(
                http_health(&self.client, &api.url, timeout).await,
                HttpHealth::Healthy { .. }
            ) {
                healthy += 1;
            }
        }

        let state = if healthy == total {
            HealthState::Healthy
        } else if healthy * 2 > total {
            HealthState::Degraded
        } else {
            HealthState::Critical
        };

        if state == HealthState::Critical {
            self.raise_problem(
                "API_CRITICAL",
                &format!("Only {healthy}/{total} external APIs reachable"),
                "api_check",
            )
            .await?;
        }
        Ok(ComponentHealth::new("apis", state).with_detail(format!("{healthy}/{total} healthy")))
    }

    /// Permission audit over configured secret and data files. Missing
    /// files are skipped. One exposed file degrades; more than one is
    /// critical and raises `SECURITY_CRITICAL`.
    pub async fn check_security(&self) -> Result<ComponentHealth, MonitorError> {
        let monitor = &self.config.monitor;
        if monitor.secret_files.is_empty() && monitor.protected_files.is_empty() {
            return Ok(ComponentHealth::new("security", HealthState::Unknown));
        }

        let mut issues = Vec::new();
        for path in &monitor.secret_files {
            if let FileExposure::Exposed { mode } = file_exposure(path, DENY_ANY_ACCESS) {
                issues.push(format!(
                    "{} readable beyond owner (mode {mode:o})",
                    path.display()
                ));
            }
        }
        for path in &monitor.protected_files {
            if let FileExposure::Exposed { mode } = file_exposure(path, DENY_WRITE) {
                issues.push(format!(
                    "{} writable beyond owner (mode {mode:o})",
                    path.display()
                ));
            }
        }

        let state = match issues.len() {
            0 => HealthState::Healthy,
            1 => HealthState::Degraded,
            _ => HealthState::Critical,
        };
        if state == HealthState::Critical {
            self.raise_problem(
                "SECURITY_CRITICAL",
                &format!("{} security issues detected: {}", issues.len(), issues.join("; ")),
                "security_check",
            )
            .await?;
        }
        let detail = if issues.is_empty() {
            "no exposed files".to_string()
        } else {
            issues.join("; ")
        };
        Ok(ComponentHealth::new("security", state).with_detail(detail))
    }

    /// Sample host vitals and raise resource alarms above 90% pressure.
    pub async fn check_vitals(&self) -> Result<Vitals, MonitorError> {
        let vitals = {
            let mut sampler = self.sampler.lock().unwrap_or_else(|e| e.into_inner());
            sampler.sample(&self.config.housekeeping.backup_dir)
        };

        if vitals.cpu_pct > 90.0 {
            self.raise_problem(
                "HIGH_CPU",
                &format!("CPU usage at {:.1}%", vitals.cpu_pct),
                "resource_check",
            )
            .await?;
        }
        if vitals.memory_pct > 90.0 {
            self.raise_problem(
                "HIGH_MEMORY",
                &format!("Memory usage at {:.1}%", vitals.memory_pct),
                "resource_check",
            )
            .await?;
        }
        if f64::from(vitals.disk_free_pct) < self.config.housekeeping.min_free_disk_pct {
            self.raise_problem(
                "LOW_DISK",
                &format!("Only {:.1}% disk space free", vitals.disk_free_pct),
                "resource_check",
            )
            .await?;
        }
        Ok(vitals)
    }
}

/// `backend` becomes `BACKEND_DOWN`, matching the severity policy's
/// critical-kind list for known services.
fn down_kind(service: &str) -> String {
    format!("{}_DOWN", service.to_uppercase())
}

/// Port open, health endpoint unhappy: `backend` becomes
/// `BACKEND_UNHEALTHY`.
fn unhealthy_kind(service: &str) -> String {
    format!("{}_UNHEALTHY", service.to_uppercase())
}
