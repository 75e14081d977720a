//! Sequential step runner.
//!
//! Steps encode a recovery procedure, so order is a dependency chain:
//! the first failure aborts the rest. Failures are recorded in the
//! trace, never raised past the runner boundary.

use crate::housekeeping::{backup_files, cleanup_old_files};
use crate::step::Step;
use medic_config::{HousekeepingConfig, ServiceConfig};
use medic_probe::{Executor, check_port, disk_free_pct};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Everything a step may need from the environment.
#[derive(Debug, Clone, Default)]
pub struct RemedyContext {
    pub services: Vec<ServiceConfig>,
    pub housekeeping: HousekeepingConfig,
    pub probe_timeout: Duration,
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepTrace {
    pub step: String,
    pub success: bool,
    pub error: Option<String>,
    pub finished_at: String,
}

/// Outcome of a whole step sequence.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub traces: Vec<StepTrace>,
}

impl ExecutionReport {
    /// Steps never reached because an earlier one failed.
    pub fn skipped(&self, total: usize) -> usize {
        total - self.traces.len()
    }
}

pub struct RemedyRunner {
    executor: Executor,
    ctx: RemedyContext,
}

impl RemedyRunner {
    pub fn new(ctx: RemedyContext) -> Self {
        Self {
            executor: Executor::new(),
            ctx,
        }
    }

    /// Run steps in order, fail-fast. Always returns a report.
    pub async fn execute(&self, steps: &[Step]) -> ExecutionReport {
        let mut traces = Vec::with_capacity(steps.len());
        let mut success = true;

        for step in steps {
            let result = self.run_step(step).await;
            let trace = StepTrace {
                step: step.to_string(),
                success: result.is_ok(),
                error: result.err(),
                finished_at: chrono::Utc::now().to_rfc3339(),
            };
            if trace.success {
                info!(step = %trace.step, "Step succeeded");
            } else {
                warn!(step = %trace.step, error = ?trace.error, "Step failed, aborting sequence");
                success = false;
            }
            let failed = !trace.success;
            traces.push(trace);
            if failed {
                break;
            }
        }
        ExecutionReport { success, traces }
    }

    async fn run_step(&self, step: &Step) -> Result<(), String> {
        match step {
            Step::RestartService(name) => self.restart_service(name).await,
            Step::Wait(secs) => {
                tokio::time::sleep(Duration::from_secs(*secs)).await;
                Ok(())
            }
            Step::CheckPort(port) => {
                let port = u16::try_from(*port).map_err(|_| format!("invalid port {port}"))?;
                if check_port("127.0.0.1", port, self.ctx.probe_timeout).await {
                    Ok(())
                } else {
                    Err(format!("nothing listening on port {port}"))
                }
            }
            Step::CleanupLogs => {
                let mut removed = 0;
                for dir in &self.ctx.housekeeping.log_dirs {
                    removed += cleanup_old_files(dir, self.ctx.housekeeping.retention_days)
                        .map_err(|e| e.to_string())?;
                }
                info!(removed, "Log cleanup finished");
                Ok(())
            }
            Step::BackupDatabase => {
                let copied = backup_files(
                    &self.ctx.housekeeping.backup_files,
                    &self.ctx.housekeeping.backup_dir,
                )
                .map_err(|e| e.to_string())?;
                info!(copied, "Database backup finished");
                Ok(())
            }
            Step::CheckDiskSpace => {
                let free = f64::from(disk_free_pct(&self.ctx.housekeeping.backup_dir));
                if free >= self.ctx.housekeeping.min_free_disk_pct {
                    Ok(())
                } else {
                    Err(format!(
                        "only {free:.1}% disk free, need {:.1}%",
                        self.ctx.housekeeping.min_free_disk_pct
                    ))
                }
            }
            Step::Unknown(raw) => Err(format!("unknown step: {raw}")),
        }
    }

    async fn restart_service(&self, name: &str) -> Result<(), String> {
        let service = self
            .ctx
            .services
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| format!("no service named {name} configured"))?;
        let cmd = service
            .restart_cmd
            .as_deref()
            .ok_or_else(|| format!("service {name} has no restart command"))?;

        info!(service = name, "Restarting service");
        self.executor
            .run_timeout(cmd, Duration::from_secs(60))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
