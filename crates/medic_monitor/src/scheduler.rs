//! The perpetual loop: poll health, sync collaboration, run daily tasks,
//! and shut down cleanly on ctrl-c.

use crate::monitor::Monitor;
use crate::tasks::DailyTasks;
use crate::MonitorError;
use medic_collab::{CollabBus, SharingGate};
use medic_learn::LearningReport;
use medic_remedy::housekeeping::{backup_files, cleanup_old_files};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Scheduler {
    monitor: Monitor,
    bus: CollabBus,
    tasks: DailyTasks,
}

impl Scheduler {
    pub fn new(monitor: Monitor) -> Self {
        let config = monitor.config();
        let bus = CollabBus::new(
            monitor.store().clone(),
            config.agent.id.clone(),
            SharingGate::from_config(&config.learning),
        );
        Self {
            monitor,
            bus,
            // Do not re-run every daily task just because the process
            // restarted mid-day.
            tasks: DailyTasks::starting_today(chrono::Local::now().date_naive()),
        }
    }

    /// Run until ctrl-c. Check failures are logged and the loop keeps
    /// going; only losing the store stops the agent.
    pub async fn run(mut self) -> Result<(), MonitorError> {
        let config = self.monitor.config().clone();
        let mut poll = tokio::time::interval(Duration::from_secs(config.monitor.poll_interval_secs));
        let mut sync = tokio::time::interval(Duration::from_secs(config.monitor.sync_interval_secs));

        info!(
            agent = %config.agent.id,
            poll_secs = config.monitor.poll_interval_secs,
            "Monitor loop starting"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.monitor.run_cycle().await {
                        error!(error = %e, "Health check cycle failed");
                    }
                    self.run_due_daily_tasks();
                }
                _ = sync.tick() => {
                    match self.bus.sync() {
                        Ok(summary) if summary.imported > 0 || summary.failed > 0 => {
                            info!(imported = summary.imported, failed = summary.failed, "Synced collaboration bus");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Collaboration sync failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.monitor.store().checkpoint()?;
        info!("Monitor stopped cleanly");
        Ok(())
    }

    fn run_due_daily_tasks(&mut self) {
        let config = self.monitor.config().clone();
        let hk = &config.housekeeping;
        let due = self.tasks.take_due(
            chrono::Local::now(),
            hk.report_hour,
            hk.cleanup_hour,
            hk.backup_hour,
        );

        if due.report {
            match LearningReport::generate(self.monitor.store(), &config.agent.id, &config.learning)
                .and_then(|r| r.write_to(&hk.report_dir))
            {
                Ok(path) => info!(path = %path.display(), "Daily learning report saved"),
                Err(e) => error!(error = %e, "Daily report failed"),
            }
        }

        if due.cleanup {
            let mut dirs = hk.log_dirs.clone();
            dirs.push(hk.report_dir.clone());
            dirs.push(config.alerts.dir.clone());
            let mut removed = 0;
            for dir in &dirs {
                match cleanup_old_files(dir, hk.retention_days) {
                    Ok(n) => removed += n,
                    Err(e) => warn!(dir = %dir.display(), error = %e, "Cleanup failed"),
                }
            }
            info!(removed, "Daily log cleanup done");
        }

        if due.backup {
            match backup_files(&hk.backup_files, &hk.backup_dir) {
                Ok(copied) => info!(copied, "Daily backup done"),
                Err(e) => error!(error = %e, "Daily backup failed"),
            }
        }
    }
}
