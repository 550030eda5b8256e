/*!
Test harness wiring the core tasks against in-memory collaborators

- `MemoryStatsState` seeded with an instance id
- `MockStatsClient` recording statshub traffic
- `BroadcastNotifier` for observing change notifications
- a sampler on a `FixedProbe`, so system gauges are deterministic
*/

use crate::fixtures::FixedProbe;
use crate::mock_client::MockStatsClient;
use statpulse_core::{
    BroadcastNotifier, FetchTask, MemoryStatsState, Platform, PublishTask, ScheduleConfig,
    Scheduler, SyncEvent, SystemMetricsSampler,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test writer; safe to call repeatedly
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub struct TestHarness {
    pub client: MockStatsClient,
    pub state: Arc<MemoryStatsState>,
    pub notifier: Arc<BroadcastNotifier>,
    pub sampler: Arc<SystemMetricsSampler>,
}

impl TestHarness {
    pub fn new(instance_id: &str) -> Self {
        Self::with_probe(instance_id, FixedProbe::default(), Platform::Unix)
    }

    pub fn with_probe(instance_id: &str, probe: FixedProbe, platform: Platform) -> Self {
        init_tracing();

        Self {
            client: MockStatsClient::new(),
            state: Arc::new(MemoryStatsState::new(instance_id)),
            notifier: Arc::new(BroadcastNotifier::default()),
            sampler: Arc::new(SystemMetricsSampler::with_probe(Box::new(probe), platform)),
        }
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.notifier.subscribe()
    }

    pub fn fetch_task(&self) -> FetchTask {
        FetchTask::new(
            Arc::new(self.client.clone()),
            self.state.clone(),
            self.notifier.clone(),
        )
    }

    pub fn publish_task(&self) -> PublishTask {
        PublishTask::new(
            Arc::new(self.client.clone()),
            self.state.clone(),
            self.sampler.clone(),
        )
    }

    pub fn scheduler(&self, config: ScheduleConfig) -> Scheduler {
        Scheduler::new(
            Arc::new(self.fetch_task()),
            Arc::new(self.publish_task()),
            config,
        )
    }
}
