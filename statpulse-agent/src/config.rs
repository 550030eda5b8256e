//! Agent configuration
//!
//! Handles:
//! - statshub endpoint and request timeout
//! - fetch/publish cadence
//! - instance identity and the regions to track

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use statpulse_core::{ClientConfig, MemoryStatsState, Region, ScheduleConfig};
use std::path::{Path, PathBuf};

/// Overrides the OS-specific config location
pub const CONFIG_ENV: &str = "STATPULSE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub statshub: ClientConfig,
    pub schedule: ScheduleConfig,
    pub instance: InstanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub instance_id: String,
    pub owner_id: Option<String>,
    pub region: Option<String>,
    pub regions: Vec<RegionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub code: String,
    pub name: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            owner_id: None,
            region: None,
            regions: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load config from `STATPULSE_CONFIG` or the OS-specific location
    pub async fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path).await
    }

    /// Missing file means first run: defaults are returned, nothing is written
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        config.schedule.validate()?;
        Ok(config)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("statpulse");
        path.push("config.toml");
        Ok(path)
    }

    /// Seed an in-memory state store from the instance section
    pub fn build_state(&self) -> MemoryStatsState {
        let state = MemoryStatsState::new(self.instance.instance_id.clone());
        for entry in &self.instance.regions {
            state.add_region(Region::new(entry.code.clone(), entry.name.clone()));
        }
        state.set_owner_id(self.instance.owner_id.clone());
        state.set_location(self.instance.region.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statpulse_core::StatsState;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.schedule.fetch_interval_secs, 60);
        assert_eq!(config.statshub.request_timeout_secs, 10);
        assert!(!config.instance.instance_id.is_empty());
        assert!(config.instance.owner_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_from(&dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.schedule.publish_interval_secs, 300);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AgentConfig::default();
        config.instance.owner_id = Some("u1".to_string());
        config.instance.regions.push(RegionEntry {
            code: "FR".to_string(),
            name: "France".to_string(),
        });
        config.save_to(&path).await.unwrap();

        let loaded = AgentConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.instance.instance_id, config.instance.instance_id);
        assert_eq!(loaded.instance.owner_id.as_deref(), Some("u1"));
        assert_eq!(loaded.instance.regions, config.instance.regions);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(
            &path,
            "[statshub]\nbase_url = \"http://stats.local\"\n\n[instance]\ninstance_id = \"i1\"\n",
        )
        .await
        .unwrap();

        let config = AgentConfig::load_from(&path).await.unwrap();
        assert_eq!(config.statshub.base_url, "http://stats.local");
        assert_eq!(config.statshub.request_timeout_secs, 10);
        assert_eq!(config.instance.instance_id, "i1");
        assert_eq!(config.schedule.shutdown_grace_secs, 30);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[schedule]\nfetch_interval_secs = 0\n")
            .await
            .unwrap();

        assert!(AgentConfig::load_from(&path).await.is_err());
    }

    #[test]
    fn test_build_state_seeds_instance() {
        let mut config = AgentConfig::default();
        config.instance.instance_id = "i1".to_string();
        config.instance.owner_id = Some("u1".to_string());
        config.instance.region = Some("DE".to_string());
        config.instance.regions.push(RegionEntry {
            code: "DE".to_string(),
            name: "Germany".to_string(),
        });

        let state = config.build_state();
        let identity = state.identity();
        assert_eq!(identity.instance_id, "i1");
        assert_eq!(identity.owner_id.as_deref(), Some("u1"));
        assert_eq!(state.location_region().as_deref(), Some("DE"));
        assert_eq!(state.region_codes(), vec!["DE".to_string()]);
    }
}
