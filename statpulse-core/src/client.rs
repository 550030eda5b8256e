//! Statshub client boundary
//!
//! The tasks talk to `RemoteStatsClient` only. `HttpStatsClient` is the JSON
//! over HTTP implementation; every request carries the configured timeout so a
//! hung statshub can never wedge a tick.

use crate::config::ClientConfig;
use crate::error::{Result, StatsError};
use crate::gauges::{AggregateResponse, GaugeSet};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

#[async_trait]
pub trait RemoteStatsClient: Send + Sync {
    /// Aggregates for one dimension. `None` when statshub has nothing yet.
    async fn fetch_aggregate(&self, dimension: &str) -> Result<Option<AggregateResponse>>;

    async fn publish(
        &self,
        subject_id: &str,
        owner_id: &str,
        region_code: &str,
        stats: &GaugeSet,
    ) -> Result<()>;
}

/// Body of `POST /stats/{subject_id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    user_id: &'a str,
    country_code: &'a str,
    gauges: &'a GaugeSet,
}

#[derive(Clone)]
pub struct HttpStatsClient {
    http: Client,
    base_url: String,
}

impl HttpStatsClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn stats_url(&self, path: &str) -> String {
        format!("{}/stats/{}", self.base_url, path)
    }
}

#[async_trait]
impl RemoteStatsClient for HttpStatsClient {
    async fn fetch_aggregate(&self, dimension: &str) -> Result<Option<AggregateResponse>> {
        let url = self.stats_url(dimension);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No aggregate stats for dimension {}", dimension);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StatsError::Status { status, url });
        }

        let body = response.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        let aggregate: AggregateResponse = serde_json::from_str(body)?;
        Ok(Some(aggregate))
    }

    async fn publish(
        &self,
        subject_id: &str,
        owner_id: &str,
        region_code: &str,
        stats: &GaugeSet,
    ) -> Result<()> {
        let url = self.stats_url(subject_id);
        let request = PublishRequest {
            user_id: owner_id,
            country_code: region_code,
            gauges: stats,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Status { status, url });
        }

        debug!("Published {} gauges for {}", stats.len(), subject_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(server: &Server) -> HttpStatsClient {
        let config = ClientConfig {
            base_url: format!("{}/", server.url()),
            request_timeout_secs: 5,
        };
        HttpStatsClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_aggregate_parses_dims() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/stats/country")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"dims": {"country": {"total": {"usersOnline": 10}}}}).to_string())
            .create_async()
            .await;

        let resp = client_for(&server).fetch_aggregate("country").await.unwrap().unwrap();
        assert_eq!(resp.dimension("country").unwrap()["total"].get("usersOnline"), Some(10));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_aggregate_not_found_is_none() {
        let mut server = Server::new_async().await;
        server.mock("GET", "/stats/country").with_status(404).create_async().await;

        let resp = client_for(&server).fetch_aggregate("country").await.unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_fetch_aggregate_null_body_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/stats/country")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let resp = client_for(&server).fetch_aggregate("country").await.unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_fetch_aggregate_server_error() {
        let mut server = Server::new_async().await;
        server.mock("GET", "/stats/country").with_status(500).create_async().await;

        let err = client_for(&server).fetch_aggregate("country").await.unwrap_err();
        assert!(matches!(err, StatsError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_fetch_aggregate_malformed_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/stats/country")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client_for(&server).fetch_aggregate("country").await.unwrap_err();
        assert!(matches!(err, StatsError::Decode(_)));
    }

    #[tokio::test]
    async fn test_publish_posts_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/stats/i1")
            .match_body(Matcher::Json(json!({
                "userId": "u1",
                "countryCode": "FR",
                "gauges": {"memoryUsage": 4096}
            })))
            .with_status(200)
            .create_async()
            .await;

        let stats: GaugeSet = [("memoryUsage", 4096)].into_iter().collect();
        client_for(&server).publish("i1", "u1", "FR", &stats).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let mut server = Server::new_async().await;
        server.mock("POST", "/stats/u1").with_status(503).create_async().await;

        let result = client_for(&server).publish("u1", "u1", "xx", &GaugeSet::new()).await;
        assert!(matches!(result, Err(StatsError::Status { .. })));
    }
}
