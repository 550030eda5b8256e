//! System metrics sampling for outbound snapshots
//!
//! Decorates an existing `GaugeSet` with:
//! - process and system CPU load (percent, integer)
//! - load average (scaled x100 like the CPU gauges)
//! - committed memory in bytes
//! - open file descriptor count
//!
//! CPU and descriptor gauges need unix facilities. The platform is checked
//! once when the sampler is built; elsewhere those gauges read a flat 0.

mod probe;

pub use probe::{HostProbe, SysinfoProbe};

use crate::error::Result;
use crate::gauges::{Gauge, GaugeSet};
use tracing::debug;

/// Value stored for gated gauges the platform cannot provide
const FALLBACK: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Unsupported,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(unix) {
            Platform::Unix
        } else {
            Platform::Unsupported
        }
    }
}

/// Scale a [0, 1] load to an integer percentage, truncating toward zero.
///
/// Also applied to the load average, which is not a fraction; kept that way
/// so published values stay comparable with existing data.
pub fn scale_percent(value: Option<f64>) -> Option<i64> {
    value.map(|v| (v * 100.0) as i64)
}

pub struct SystemMetricsSampler {
    probe: Box<dyn HostProbe>,
    platform: Platform,
}

impl SystemMetricsSampler {
    pub fn new() -> Self {
        Self::with_probe(Box::new(SysinfoProbe::new()), Platform::detect())
    }

    pub fn with_probe(probe: Box<dyn HostProbe>, platform: Platform) -> Self {
        debug!("System metrics sampler on {:?} platform", platform);
        Self { probe, platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Add the system gauges to `stats`, all read from one fresh sample
    pub fn decorate(&self, stats: &mut GaugeSet) {
        self.probe.refresh();

        let process_cpu = self.gated(Gauge::ProcessCpuUsage, || self.probe.process_cpu_load());
        stats.set_gauge(Gauge::ProcessCpuUsage, scale_percent(process_cpu));

        let system_cpu = self.gated(Gauge::SystemCpuUsage, || self.probe.system_cpu_load());
        stats.set_gauge(Gauge::SystemCpuUsage, scale_percent(system_cpu));

        stats.set_gauge(
            Gauge::SystemLoadAverage,
            scale_percent(self.probe.system_load_average()),
        );

        match self.probe.committed_memory() {
            Ok(bytes) => stats.set_gauge(Gauge::MemoryUsage, i64::try_from(bytes).ok()),
            Err(e) => debug!("Unable to get system stat {}: {}", Gauge::MemoryUsage.as_str(), e),
        }

        let descriptors = self.gated(Gauge::OpenFileDescriptors, || {
            self.probe
                .open_file_descriptors()
                .map(|count| count.map(|n| n as f64))
        });
        stats.set_gauge(Gauge::OpenFileDescriptors, descriptors.map(|n| n as i64));
    }

    fn gated(&self, gauge: Gauge, read: impl FnOnce() -> Result<Option<f64>>) -> Option<f64> {
        if self.platform != Platform::Unix {
            return Some(FALLBACK);
        }
        match read() {
            Ok(value) => value,
            Err(e) => {
                debug!("Unable to get system stat {}: {}", gauge.as_str(), e);
                Some(FALLBACK)
            }
        }
    }
}

impl Default for SystemMetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}
