//! Shared application state read and written by the periodic tasks
//!
//! The tasks only see the `StatsState` trait. `MemoryStatsState` keeps every
//! field behind its own lock so fetch and publish never contend on one mutex.

use crate::gauges::{GaugeSet, InstanceCounters, InstanceIdentity, Region};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Field-level accessors onto the application state store
pub trait StatsState: Send + Sync {
    fn global_stats(&self) -> Option<GaugeSet>;
    fn set_global_stats(&self, stats: GaugeSet);

    fn regions(&self) -> BTreeMap<String, Region>;
    fn region_codes(&self) -> Vec<String>;
    /// Unknown codes are ignored
    fn set_region_stats(&self, code: &str, stats: GaugeSet);

    /// Region code reported by geolocation, raw
    fn location_region(&self) -> Option<String>;
    fn identity(&self) -> InstanceIdentity;
    fn instance_counters(&self) -> InstanceCounters;
}

/// In-process state store
#[derive(Clone)]
pub struct MemoryStatsState {
    global: Shared<Option<GaugeSet>>,
    regions: Shared<BTreeMap<String, Region>>,
    location: Shared<Option<String>>,
    instance_id: Shared<String>,
    owner_id: Shared<Option<String>>,
    counters: Shared<InstanceCounters>,
}

impl MemoryStatsState {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            global: new_state(None),
            regions: new_state(BTreeMap::new()),
            location: new_state(None),
            instance_id: new_state(instance_id.into()),
            owner_id: new_state(None),
            counters: new_state(InstanceCounters::default()),
        }
    }

    pub fn with_region(self, region: Region) -> Self {
        self.add_region(region);
        self
    }

    pub fn with_location(self, code: impl Into<String>) -> Self {
        self.set_location(Some(code.into()));
        self
    }

    pub fn with_owner(self, owner_id: impl Into<String>) -> Self {
        self.set_owner_id(Some(owner_id.into()));
        self
    }

    pub fn with_counters(self, counters: InstanceCounters) -> Self {
        self.set_counters(counters);
        self
    }

    pub fn add_region(&self, region: Region) {
        self.regions.lock().insert(region.code.clone(), region);
    }

    pub fn set_location(&self, code: Option<String>) {
        *self.location.lock() = code;
    }

    pub fn set_owner_id(&self, owner_id: Option<String>) {
        *self.owner_id.lock() = owner_id;
    }

    pub fn set_counters(&self, counters: InstanceCounters) {
        *self.counters.lock() = counters;
    }
}

impl StatsState for MemoryStatsState {
    fn global_stats(&self) -> Option<GaugeSet> {
        self.global.lock().clone()
    }

    fn set_global_stats(&self, stats: GaugeSet) {
        *self.global.lock() = Some(stats);
    }

    fn regions(&self) -> BTreeMap<String, Region> {
        self.regions.lock().clone()
    }

    fn region_codes(&self) -> Vec<String> {
        self.regions.lock().keys().cloned().collect()
    }

    fn set_region_stats(&self, code: &str, stats: GaugeSet) {
        if let Some(region) = self.regions.lock().get_mut(code) {
            region.stats = Some(stats);
        }
    }

    fn location_region(&self) -> Option<String> {
        self.location.lock().clone()
    }

    fn identity(&self) -> InstanceIdentity {
        InstanceIdentity {
            instance_id: self.instance_id.lock().clone(),
            owner_id: self.owner_id.lock().clone(),
            region_code: self.location_region(),
        }
    }

    fn instance_counters(&self) -> InstanceCounters {
        self.counters.lock().clone()
    }
}
