//! Timing and endpoint settings
//!
//! Defaults match the production cadence: fetch every minute, publish every
//! five minutes after a one minute warm-up, thirty seconds to drain on stop.

use crate::error::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub fetch_interval_secs: u64,
    pub publish_interval_secs: u64,
    /// Gives the rest of the application time to fill in instance metadata
    pub publish_initial_delay_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: 60,
            publish_interval_secs: 300,
            publish_initial_delay_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl ScheduleConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    pub fn publish_initial_delay(&self) -> Duration {
        Duration::from_secs(self.publish_initial_delay_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Zero periods would make `tokio::time::interval` panic
    pub fn validate(&self) -> Result<()> {
        if self.fetch_interval_secs == 0 {
            return Err(StatsError::Config("fetch_interval_secs must be > 0".into()));
        }
        if self.publish_interval_secs == 0 {
            return Err(StatsError::Config("publish_interval_secs must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:15670".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.fetch_interval(), Duration::from_secs(60));
        assert_eq!(schedule.publish_interval(), Duration::from_secs(300));
        assert_eq!(schedule.publish_initial_delay(), Duration::from_secs(60));
        assert_eq!(schedule.shutdown_grace(), Duration::from_secs(30));
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let schedule = ScheduleConfig {
            fetch_interval_secs: 0,
            ..ScheduleConfig::default()
        };
        assert!(matches!(schedule.validate(), Err(StatsError::Config(_))));
    }
}
