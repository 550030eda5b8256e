//! StatPulse core - periodic stats exchange with statshub
//!
//! Two independent periodic jobs share the application state:
//! - fetch: pull per-country aggregates, merge them into state, notify observers
//! - publish: push this instance's counters, decorated with system gauges
//!
//! Failures stay inside the tick that hit them; the timers never stop on
//! their own.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod gauges;
pub mod metrics;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use client::{HttpStatsClient, RemoteStatsClient};
pub use config::{ClientConfig, ScheduleConfig};
pub use error::{Result, StatsError};
pub use events::{BroadcastNotifier, ChangeNotifier, NoopNotifier, SyncEvent, SyncPath};
pub use gauges::{
    resolve_region, AggregateResponse, Gauge, GaugeSet, InstanceCounters, InstanceIdentity, Region,
    UNKNOWN_REGION,
};
pub use metrics::{scale_percent, HostProbe, Platform, SysinfoProbe, SystemMetricsSampler};
pub use scheduler::Scheduler;
pub use state::{MemoryStatsState, StatsState};
pub use tasks::{FetchTask, PeriodicTask, PublishTask};
