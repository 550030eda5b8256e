/*!
Mock statshub client for tests without a server

Records every publish and serves a scripted aggregate response. Both calls
can be switched to fail to exercise the error paths.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use statpulse_core::{AggregateResponse, GaugeSet, RemoteStatsClient, Result, StatsError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedStats {
    pub subject_id: String,
    pub owner_id: String,
    pub region_code: String,
    pub stats: GaugeSet,
}

/// Clones share the same recordings
#[derive(Clone, Default)]
pub struct MockStatsClient {
    published: Arc<Mutex<Vec<PublishedStats>>>,
    aggregate: Arc<Mutex<Option<AggregateResponse>>>,
    fetch_calls: Arc<AtomicUsize>,
    publish_calls: Arc<AtomicUsize>,
    fail_fetch: Arc<AtomicBool>,
    fail_publish: Arc<AtomicBool>,
}

impl MockStatsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aggregate(self, aggregate: AggregateResponse) -> Self {
        self.set_aggregate(Some(aggregate));
        self
    }

    /// Response served by every following `fetch_aggregate`
    pub fn set_aggregate(&self, aggregate: Option<AggregateResponse>) {
        *self.aggregate.lock() = aggregate;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Attempts, including failed ones
    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Successful publishes, in call order
    pub fn published(&self) -> Vec<PublishedStats> {
        self.published.lock().clone()
    }

    pub fn find_by_subject(&self, subject_id: &str) -> Vec<PublishedStats> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.subject_id == subject_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RemoteStatsClient for MockStatsClient {
    async fn fetch_aggregate(&self, _dimension: &str) -> Result<Option<AggregateResponse>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StatsError::Unavailable("mock fetch failure".into()));
        }
        Ok(self.aggregate.lock().clone())
    }

    async fn publish(
        &self,
        subject_id: &str,
        owner_id: &str,
        region_code: &str,
        stats: &GaugeSet,
    ) -> Result<()> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(StatsError::Unavailable("mock publish failure".into()));
        }

        self.published.lock().push(PublishedStats {
            subject_id: subject_id.to_string(),
            owner_id: owner_id.to_string(),
            region_code: region_code.to_string(),
            stats: stats.clone(),
        });
        tracing::debug!("[MOCK] Published stats for {}", subject_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_records_publishes() {
        let client = MockStatsClient::new();
        let stats: GaugeSet = [("bytesGiven", 1)].into_iter().collect();

        client.publish("i1", "u1", "FR", &stats).await.unwrap();
        client.publish("u1", "u1", "FR", &stats).await.unwrap();

        assert_eq!(client.publish_count(), 2);
        assert_eq!(client.find_by_subject("i1").len(), 1);
        assert_eq!(client.published()[1].subject_id, "u1");
    }

    #[tokio::test]
    async fn test_mock_client_failures() {
        let client = MockStatsClient::new();
        client.fail_fetches(true);
        client.fail_publishes(true);

        assert!(client.fetch_aggregate("country").await.is_err());
        assert!(client.publish("i1", "u1", "FR", &GaugeSet::new()).await.is_err());
        assert_eq!(client.fetch_count(), 1);
        assert_eq!(client.publish_count(), 1);
        assert!(client.published().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_recordings() {
        let client = MockStatsClient::new().with_aggregate(AggregateResponse::default());
        let clone = client.clone();

        clone.fetch_aggregate("country").await.unwrap();
        assert_eq!(client.fetch_count(), 1);
    }
}
