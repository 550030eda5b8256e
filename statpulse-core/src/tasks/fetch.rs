use super::PeriodicTask;
use crate::client::RemoteStatsClient;
use crate::error::Result;
use crate::events::{ChangeNotifier, SyncEvent, SyncPath};
use crate::gauges::AggregateResponse;
use crate::state::StatsState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dimension the aggregate stats are grouped by
pub const COUNTRY_DIMENSION: &str = "country";

pub struct FetchTask {
    client: Arc<dyn RemoteStatsClient>,
    state: Arc<dyn StatsState>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl FetchTask {
    pub fn new(
        client: Arc<dyn RemoteStatsClient>,
        state: Arc<dyn StatsState>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            client,
            state,
            notifier,
        }
    }

    /// One fetch-and-merge pass. Returns whether anything was merged.
    ///
    /// Regions missing from the response keep whatever stats they had.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(response) = self.client.fetch_aggregate(COUNTRY_DIMENSION).await? else {
            debug!("Statshub returned no aggregate stats");
            return Ok(false);
        };
        let Some(by_country) = response.dimension(COUNTRY_DIMENSION) else {
            debug!("Aggregate stats carry no {} dimension", COUNTRY_DIMENSION);
            return Ok(false);
        };

        if let Some(total) = by_country.get(AggregateResponse::TOTAL_KEY) {
            self.state.set_global_stats(total.clone());
        }

        let codes = self.state.region_codes();
        let mut updated = 0;
        for code in &codes {
            if let Some(stats) = by_country.get(code) {
                self.state.set_region_stats(code, stats.clone());
                updated += 1;
            }
        }
        debug!("Merged aggregate stats for {}/{} regions", updated, codes.len());

        let global = serde_json::to_value(self.state.global_stats())?;
        let regions = serde_json::to_value(self.state.regions())?;
        self.notifier.sync(SyncEvent::new(SyncPath::GlobalStats, global));
        self.notifier.sync(SyncEvent::new(SyncPath::Regions, regions));

        Ok(true)
    }
}

#[async_trait]
impl PeriodicTask for FetchTask {
    fn name(&self) -> &'static str {
        "stats-fetch"
    }

    async fn tick(&self) {
        if let Err(e) = self.run_once().await {
            warn!("Unable to fetch stats: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use crate::events::{BroadcastNotifier, NoopNotifier};
    use crate::gauges::{GaugeSet, Region};
    use crate::state::MemoryStatsState;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct ScriptedClient {
        response: Mutex<Option<Result<Option<AggregateResponse>>>>,
    }

    impl ScriptedClient {
        fn new(response: Result<Option<AggregateResponse>>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
            })
        }
    }

    #[async_trait]
    impl RemoteStatsClient for ScriptedClient {
        async fn fetch_aggregate(&self, dimension: &str) -> Result<Option<AggregateResponse>> {
            assert_eq!(dimension, COUNTRY_DIMENSION);
            self.response.lock().take().unwrap_or(Ok(None))
        }

        async fn publish(&self, _: &str, _: &str, _: &str, _: &GaugeSet) -> Result<()> {
            unreachable!("fetch never publishes")
        }
    }

    fn gauges(value: i64) -> GaugeSet {
        [("usersOnline", value)].into_iter().collect()
    }

    fn country_response(entries: &[(&str, i64)]) -> AggregateResponse {
        let by_country: HashMap<String, GaugeSet> =
            entries.iter().map(|(k, v)| (k.to_string(), gauges(*v))).collect();
        AggregateResponse {
            dims: HashMap::from([(COUNTRY_DIMENSION.to_string(), by_country)]),
        }
    }

    fn seeded_state() -> Arc<MemoryStatsState> {
        Arc::new(
            MemoryStatsState::new("i1")
                .with_region(Region::new("FR", "France"))
                .with_region(Region::new("DE", "Germany")),
        )
    }

    #[tokio::test]
    async fn test_merges_total_and_known_regions() {
        let state = seeded_state();
        state.set_region_stats("DE", gauges(1));
        let notifier = Arc::new(BroadcastNotifier::default());
        let mut rx = notifier.subscribe();

        let client = ScriptedClient::new(Ok(Some(country_response(&[("total", 100), ("FR", 7), ("US", 50)]))));
        let task = FetchTask::new(client, state.clone(), notifier.clone());

        assert!(task.run_once().await.unwrap());
        assert_eq!(state.global_stats(), Some(gauges(100)));

        let regions = state.regions();
        assert_eq!(regions["FR"].stats, Some(gauges(7)));
        // DE was not in the response: previous value survives
        assert_eq!(regions["DE"].stats, Some(gauges(1)));
        assert!(!regions.contains_key("US"));

        assert_eq!(rx.recv().await.unwrap().path, SyncPath::GlobalStats);
        let regions_event = rx.recv().await.unwrap();
        assert_eq!(regions_event.path, SyncPath::Regions);
        assert_eq!(regions_event.payload["FR"]["stats"]["usersOnline"], 7);
    }

    #[tokio::test]
    async fn test_missing_dimension_leaves_state_untouched() {
        let state = seeded_state();
        state.set_global_stats(gauges(5));
        let notifier = Arc::new(BroadcastNotifier::default());
        let mut rx = notifier.subscribe();

        let client = ScriptedClient::new(Ok(Some(AggregateResponse::default())));
        let task = FetchTask::new(client, state.clone(), notifier.clone());

        assert!(!task.run_once().await.unwrap());
        assert_eq!(state.global_stats(), Some(gauges(5)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_total_keeps_global() {
        let state = seeded_state();
        state.set_global_stats(gauges(5));

        let client = ScriptedClient::new(Ok(Some(country_response(&[("FR", 2)]))));
        let task = FetchTask::new(client, state.clone(), Arc::new(NoopNotifier));

        assert!(task.run_once().await.unwrap());
        assert_eq!(state.global_stats(), Some(gauges(5)));
        assert_eq!(state.regions()["FR"].stats, Some(gauges(2)));
    }

    #[tokio::test]
    async fn test_tick_swallows_remote_errors() {
        let state = seeded_state();
        let notifier = Arc::new(BroadcastNotifier::default());
        let mut rx = notifier.subscribe();

        let client = ScriptedClient::new(Err(StatsError::Unavailable("connection refused".into())));
        let task = FetchTask::new(client, state.clone(), notifier.clone());

        task.tick().await;
        assert!(state.global_stats().is_none());
        assert!(rx.try_recv().is_err());
    }
}
