//! Gauge data model shared by the fetch and publish paths
//!
//! - `Gauge`: wire-stable names of the system gauges we produce
//! - `GaugeSet`: one snapshot of named numeric gauges
//! - `AggregateResponse`: dimension-grouped aggregates pulled from statshub
//! - `InstanceIdentity` / `InstanceCounters`: what we publish about ourselves

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Region code published when the local region is unknown
pub const UNKNOWN_REGION: &str = "xx";

/// Placeholder some geolocation sources report instead of a real code
const REGION_PLACEHOLDER: &str = "--";

/// System gauges filled in by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gauge {
    #[serde(rename = "processCPUUsage")]
    ProcessCpuUsage,
    #[serde(rename = "systemCPUUsage")]
    SystemCpuUsage,
    #[serde(rename = "systemLoadAverage")]
    SystemLoadAverage,
    #[serde(rename = "memoryUsage")]
    MemoryUsage,
    #[serde(rename = "openFileDescriptors")]
    OpenFileDescriptors,
}

impl Gauge {
    pub const ALL: [Gauge; 5] = [
        Gauge::ProcessCpuUsage,
        Gauge::SystemCpuUsage,
        Gauge::SystemLoadAverage,
        Gauge::MemoryUsage,
        Gauge::OpenFileDescriptors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gauge::ProcessCpuUsage => "processCPUUsage",
            Gauge::SystemCpuUsage => "systemCPUUsage",
            Gauge::SystemLoadAverage => "systemLoadAverage",
            Gauge::MemoryUsage => "memoryUsage",
            Gauge::OpenFileDescriptors => "openFileDescriptors",
        }
    }
}

/// A snapshot of gauges keyed by name.
///
/// Absence of a key means "not measured". Externally defined gauges (anything
/// statshub sends back) live next to the `Gauge` ones under their own names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GaugeSet {
    values: HashMap<String, i64>,
}

impl GaugeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a gauge. `None` leaves the gauge unset.
    pub fn set(&mut self, name: impl Into<String>, value: Option<i64>) {
        let name = name.into();
        match value {
            Some(v) => {
                self.values.insert(name, v);
            }
            None => {
                self.values.remove(&name);
            }
        }
    }

    pub fn set_gauge(&mut self, gauge: Gauge, value: Option<i64>) {
        self.set(gauge.as_str(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn gauge(&self, gauge: Gauge) -> Option<i64> {
        self.get(gauge.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for GaugeSet {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Aggregate statistics as returned by `GET /stats/{dimension}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    #[serde(default)]
    pub dims: HashMap<String, HashMap<String, GaugeSet>>,
}

impl AggregateResponse {
    /// Dimension key holding the global aggregate
    pub const TOTAL_KEY: &'static str = "total";

    pub fn dimension(&self, name: &str) -> Option<&HashMap<String, GaugeSet>> {
        self.dims.get(name)
    }
}

/// Map a locally known region code to the one we publish under.
///
/// Blank, missing and `"--"` all collapse to `"xx"`.
pub fn resolve_region(code: Option<&str>) -> String {
    match code {
        Some(c) if !c.trim().is_empty() && c != REGION_PLACEHOLDER => c.to_string(),
        _ => UNKNOWN_REGION.to_string(),
    }
}

/// Identity used as subject/owner when publishing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    pub instance_id: String,
    /// Not assigned until the owner has signed in
    pub owner_id: Option<String>,
    pub region_code: Option<String>,
}

impl InstanceIdentity {
    pub fn resolved_region(&self) -> String {
        resolve_region(self.region_code.as_deref())
    }
}

/// Raw per-instance counters maintained by the rest of the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCounters {
    pub counters: BTreeMap<String, i64>,
    pub online: bool,
}

impl InstanceCounters {
    pub fn with_counter(mut self, name: impl Into<String>, value: i64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    /// Per-instance form, decorated later with system gauges
    pub fn to_instance_stats(&self) -> GaugeSet {
        self.to_stats("instanceOnline")
    }

    /// Aggregate-per-owner form, published under the owner id
    pub fn to_user_stats(&self) -> GaugeSet {
        self.to_stats("userOnline")
    }

    fn to_stats(&self, online_gauge: &str) -> GaugeSet {
        let mut stats: GaugeSet = self
            .counters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        stats.set(online_gauge, Some(i64::from(self.online)));
        stats
    }
}

/// A region we track aggregate stats for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub stats: Option<GaugeSet>,
}

impl Region {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            stats: None,
        }
    }
}
