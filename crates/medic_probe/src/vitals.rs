//! Host vitals via sysinfo: CPU, memory, disk headroom, load average.

use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::{Disks, System};

/// A point-in-time sample of host resource usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
    pub cpu_pct: f32,
    pub memory_pct: f32,
    pub disk_free_pct: f32,
    pub load_one: f64,
}

/// Stateful sampler. CPU usage needs two refreshes to produce a real
/// number, so keep one sampler alive rather than rebuilding per poll.
pub struct VitalsSampler {
    system: System,
    disks: Disks,
}

impl VitalsSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            disks: Disks::new_with_refreshed_list(),
        }
    }

    /// Refresh and sample. `disk_path` picks which mount's free space to
    /// report; the mount with the longest matching prefix wins.
    pub fn sample(&mut self, disk_path: &Path) -> Vitals {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh(true);

        let total_mem = self.system.total_memory();
        let memory_pct = if total_mem == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let pct = self.system.used_memory() as f32 / total_mem as f32 * 100.0;
            pct
        };

        let disk_free_pct = self
            .disks
            .iter()
            .filter(|d| disk_path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map_or(100.0, |d| {
                let total = d.total_space();
                if total == 0 {
                    100.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let pct = d.available_space() as f32 / total as f32 * 100.0;
                    pct
                }
            });

        Vitals {
            cpu_pct: self.system.global_cpu_usage(),
            memory_pct,
            disk_free_pct,
            load_one: System::load_average().one,
        }
    }
}

impl Default for VitalsSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot free-space percentage for the mount holding `path`.
pub fn disk_free_pct(path: &Path) -> f32 {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map_or(100.0, |d| {
            let total = d.total_space();
            if total == 0 {
                100.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let pct = d.available_space() as f32 / total as f32 * 100.0;
                pct
            }
        })
}
