//! Host probes: the platform calls behind each system gauge
//!
//! Every read is its own fallible call so one missing facility never hides
//! the others.

use crate::error::{Result, StatsError};
use parking_lot::Mutex;
use sysinfo::{Pid, System};

#[cfg(target_os = "linux")]
const FD_DIR: &str = "/proc/self/fd";
#[cfg(not(target_os = "linux"))]
const FD_DIR: &str = "/dev/fd";

pub trait HostProbe: Send + Sync {
    /// Take a new sample; the reads below report the latest one
    fn refresh(&self) {}

    /// CPU load of this process as a fraction of all cores, in [0, 1]
    fn process_cpu_load(&self) -> Result<Option<f64>>;
    /// Whole-machine CPU load, in [0, 1]
    fn system_cpu_load(&self) -> Result<Option<f64>>;
    /// One minute load average, `None` where the OS does not report one
    fn system_load_average(&self) -> Option<f64>;
    /// Memory committed to this process, in bytes
    fn committed_memory(&self) -> Result<u64>;
    fn open_file_descriptors(&self) -> Result<Option<u64>>;
}

/// `sysinfo` backed probe.
///
/// The `System` handle lives across samples: CPU usage is computed between
/// two refreshes, so a fresh handle per sample would always read zero.
pub struct SysinfoProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    /// Blocks for `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL` to take a baseline
    /// sample, so the first reads already cover a real interval.
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        let mut system = System::new();

        refresh_system(&mut system, pid);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        refresh_system(&mut system, pid);

        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    fn pid(&self, metric: &'static str) -> Result<Pid> {
        self.pid
            .ok_or_else(|| StatsError::probe(metric, "current pid unavailable"))
    }

    fn read_process<T>(
        &self,
        metric: &'static str,
        read: impl FnOnce(&sysinfo::Process, &System) -> T,
    ) -> Result<T> {
        let pid = self.pid(metric)?;
        let system = self.system.lock();
        system
            .process(pid)
            .map(|p| read(p, &system))
            .ok_or_else(|| StatsError::probe(metric, "process not found"))
    }
}

/// CPUs first: process usage is measured against the CPU time elapsed
/// between two process refreshes.
fn refresh_system(system: &mut System, pid: Option<Pid>) {
    system.refresh_cpu();
    if let Some(pid) = pid {
        system.refresh_process(pid);
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn refresh(&self) {
        refresh_system(&mut self.system.lock(), self.pid);
    }

    fn process_cpu_load(&self) -> Result<Option<f64>> {
        self.read_process("processCPUUsage", |p, system| {
            let cores = system.cpus().len().max(1) as f64;
            Some((f64::from(p.cpu_usage()) / 100.0 / cores).clamp(0.0, 1.0))
        })
    }

    fn system_cpu_load(&self) -> Result<Option<f64>> {
        let system = self.system.lock();
        let usage = f64::from(system.global_cpu_info().cpu_usage()) / 100.0;
        Ok(Some(usage.clamp(0.0, 1.0)))
    }

    fn system_load_average(&self) -> Option<f64> {
        let one = System::load_average().one;
        (one >= 0.0).then_some(one)
    }

    fn committed_memory(&self) -> Result<u64> {
        self.read_process("memoryUsage", |p, _| p.memory())
    }

    fn open_file_descriptors(&self) -> Result<Option<u64>> {
        let entries = std::fs::read_dir(FD_DIR)
            .map_err(|e| StatsError::probe("openFileDescriptors", e.to_string()))?;
        // The directory handle we just opened shows up in its own listing
        let count = entries.count().saturating_sub(1);
        Ok(Some(count as u64))
    }
}
