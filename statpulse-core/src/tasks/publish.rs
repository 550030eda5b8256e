use super::PeriodicTask;
use crate::client::RemoteStatsClient;
use crate::error::Result;
use crate::metrics::SystemMetricsSampler;
use crate::state::StatsState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PublishTask {
    client: Arc<dyn RemoteStatsClient>,
    state: Arc<dyn StatsState>,
    sampler: Arc<SystemMetricsSampler>,
}

impl PublishTask {
    pub fn new(
        client: Arc<dyn RemoteStatsClient>,
        state: Arc<dyn StatsState>,
        sampler: Arc<SystemMetricsSampler>,
    ) -> Self {
        Self {
            client,
            state,
            sampler,
        }
    }

    /// Publish instance stats, then owner stats. Returns whether anything was
    /// sent; nothing is sent until an owner id has been assigned.
    pub async fn run_once(&self) -> Result<bool> {
        let identity = self.state.identity();
        let region = identity.resolved_region();
        let Some(owner_id) = identity.owner_id.as_deref() else {
            return Ok(false);
        };

        let counters = self.state.instance_counters();

        let mut instance_stats = counters.to_instance_stats();
        self.sampler.decorate(&mut instance_stats);
        self.client
            .publish(&identity.instance_id, owner_id, &region, &instance_stats)
            .await?;

        let user_stats = counters.to_user_stats();
        self.client
            .publish(owner_id, owner_id, &region, &user_stats)
            .await?;

        debug!("Published stats for instance {} in {}", identity.instance_id, region);
        Ok(true)
    }
}

#[async_trait]
impl PeriodicTask for PublishTask {
    fn name(&self) -> &'static str {
        "stats-publish"
    }

    async fn tick(&self) {
        if let Err(e) = self.run_once().await {
            warn!("Unable to publish stats: {}", e);
        }
    }
}
