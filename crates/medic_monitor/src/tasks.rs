//! Daily task bookkeeping: each task runs once per day, at or after its
//! configured hour.

use chrono::{NaiveDate, Timelike};

/// Tracks the last day each daily task ran. Pure date arithmetic so the
/// due-logic is testable without a clock.
#[derive(Debug, Clone, Default)]
pub struct DailyTasks {
    last_report: Option<NaiveDate>,
    last_cleanup: Option<NaiveDate>,
    last_backup: Option<NaiveDate>,
}

/// Which tasks are due right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueTasks {
    pub report: bool,
    pub cleanup: bool,
    pub backup: bool,
}

impl DailyTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh tracker that treats today as already handled, so a
    /// restarted agent does not immediately re-run everything.
    pub fn starting_today(today: NaiveDate) -> Self {
        Self {
            last_report: Some(today),
            last_cleanup: Some(today),
            last_backup: Some(today),
        }
    }

    fn task_due(last: Option<NaiveDate>, now: chrono::DateTime<chrono::Local>, hour: u32) -> bool {
        let today = now.date_naive();
        last.is_none_or(|d| d < today) && now.hour() >= hour
    }

    /// Check what is due and mark those tasks as run today.
    pub fn take_due(
        &mut self,
        now: chrono::DateTime<chrono::Local>,
        report_hour: u32,
        cleanup_hour: u32,
        backup_hour: u32,
    ) -> DueTasks {
        let today = now.date_naive();
        let due = DueTasks {
            report: Self::task_due(self.last_report, now, report_hour),
            cleanup: Self::task_due(self.last_cleanup, now, cleanup_hour),
            backup: Self::task_due(self.last_backup, now, backup_hour),
        };
        if due.report {
            self.last_report = Some(today);
        }
        if due.cleanup {
            self.last_cleanup = Some(today);
        }
        if due.backup {
            self.last_backup = Some(today);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDateTime, TimeZone};

    fn at(date: &str, hour: u32) -> chrono::DateTime<Local> {
        let naive = NaiveDateTime::parse_from_str(
            &format!("{date} {hour:02}:30:00"),
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        Local.from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn test_tasks_fire_at_their_hour() {
        let mut tasks = DailyTasks::starting_today(at("2026-08-29", 12).date_naive());

        // Next day, 1 AM: only the backup is due.
        let due = tasks.take_due(at("2026-08-30", 1), 6, 2, 1);
        assert_eq!(
            due,
            DueTasks {
                report: false,
                cleanup: false,
                backup: true
            }
        );

        // 2 AM: cleanup joins, backup already done.
        let due = tasks.take_due(at("2026-08-30", 2), 6, 2, 1);
        assert!(due.cleanup && !due.backup && !due.report);

        // 6 AM: report.
        let due = tasks.take_due(at("2026-08-30", 6), 6, 2, 1);
        assert!(due.report && !due.cleanup);
    }

    #[test]
    fn test_each_task_runs_once_per_day() {
        let mut tasks = DailyTasks::new();
        let due = tasks.take_due(at("2026-08-30", 7), 6, 2, 1);
        assert!(due.report && due.cleanup && due.backup);

        // Later the same day nothing fires again.
        let due = tasks.take_due(at("2026-08-30", 23), 6, 2, 1);
        assert_eq!(due, DueTasks::default());

        // Next day they all come back.
        let due = tasks.take_due(at("2026-08-31", 7), 6, 2, 1);
        assert!(due.report && due.cleanup && due.backup);
    }

    #[test]
    fn test_missed_hour_still_runs_later() {
        let mut tasks = DailyTasks::starting_today(at("2026-08-29", 12).date_naive());
        // Agent was asleep at 6 AM; at 11 PM the report still runs.
        let due = tasks.take_due(at("2026-08-30", 23), 6, 2, 1);
        assert!(due.report);
    }
}
