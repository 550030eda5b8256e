/*!
Fixture builders for statshub payloads and host probes
*/

use statpulse_core::{AggregateResponse, GaugeSet, HostProbe, Result, StatsError};
use std::collections::HashMap;

pub fn gauges(values: &[(&str, i64)]) -> GaugeSet {
    values.iter().map(|(name, value)| (*name, *value)).collect()
}

/// Builds `AggregateResponse` values shaped like statshub's
#[derive(Default)]
pub struct AggregateBuilder {
    dims: HashMap<String, HashMap<String, GaugeSet>>,
}

impl AggregateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, dimension: &str, key: &str, values: &[(&str, i64)]) -> Self {
        self.dims
            .entry(dimension.to_string())
            .or_default()
            .insert(key.to_string(), gauges(values));
        self
    }

    pub fn total(self, values: &[(&str, i64)]) -> Self {
        self.entry("country", AggregateResponse::TOTAL_KEY, values)
    }

    pub fn country(self, code: &str, values: &[(&str, i64)]) -> Self {
        self.entry("country", code, values)
    }

    pub fn build(self) -> AggregateResponse {
        AggregateResponse { dims: self.dims }
    }

    pub fn to_json(self) -> serde_json::Value {
        serde_json::to_value(self.build()).unwrap_or_default()
    }
}

/// Host probe returning fixed readings, or failing every gated read
#[derive(Debug, Clone)]
pub struct FixedProbe {
    pub cpu_load: Option<f64>,
    pub load_average: Option<f64>,
    pub memory_bytes: u64,
    pub open_fds: Option<u64>,
    pub fail: bool,
}

impl Default for FixedProbe {
    fn default() -> Self {
        Self {
            cpu_load: Some(0.4532),
            load_average: Some(0.5),
            memory_bytes: 128 * 1024 * 1024,
            open_fds: Some(64),
            fail: false,
        }
    }
}

impl FixedProbe {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn read<T>(&self, metric: &'static str, value: T) -> Result<T> {
        if self.fail {
            Err(StatsError::probe(metric, "not available on this host"))
        } else {
            Ok(value)
        }
    }
}

impl HostProbe for FixedProbe {
    fn process_cpu_load(&self) -> Result<Option<f64>> {
        self.read("processCPUUsage", self.cpu_load)
    }

    fn system_cpu_load(&self) -> Result<Option<f64>> {
        self.read("systemCPUUsage", self.cpu_load)
    }

    fn system_load_average(&self) -> Option<f64> {
        self.load_average
    }

    fn committed_memory(&self) -> Result<u64> {
        Ok(self.memory_bytes)
    }

    fn open_file_descriptors(&self) -> Result<Option<u64>> {
        self.read("openFileDescriptors", self.open_fds)
    }
}
