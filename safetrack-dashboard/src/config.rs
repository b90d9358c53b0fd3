//! Dashboard configuration.
//!
//! TOML file in the OS config directory, defaults when absent. Only the
//! hub endpoint and the polling cadence are configurable; everything
//! else is the dashboard's fixed contract.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub poll_interval_ms: u64,
    /// Override for the durable store location; defaults to the OS data
    /// dir.
    pub data_dir: Option<String>,
    pub hub: HubEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            data_dir: None,
            hub: HubEndpoint {
                base_url: "http://127.0.0.1:3000".to_string(),
                api_key: None,
            },
        }
    }
}

impl DashboardConfig {
    /// Load config from the OS-specific location, defaults when absent.
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path).await?;
            let config: DashboardConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(&config_path, content).await?;
        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("safetrack-dashboard");
        path.push("config.toml");
        Ok(path)
    }

    /// Root of the durable store (alert history + session marker).
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(PathBuf::from(dir));
        }
        let mut path = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        path.push("safetrack-dashboard");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.hub.base_url, "http://127.0.0.1:3000");
        assert!(config.hub.api_key.is_none());
    }

    #[test]
    fn test_config_file_path() {
        let path = DashboardConfig::config_file_path().unwrap();
        assert!(path.to_string_lossy().contains("safetrack-dashboard"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = DashboardConfig::default();
        config.hub.api_key = Some("sesame".into());
        config.data_dir = Some("/tmp/safetrack-dash".into());
        let txt = toml::to_string_pretty(&config).unwrap();
        let back: DashboardConfig = toml::from_str(&txt).unwrap();
        assert_eq!(back.hub.api_key.as_deref(), Some("sesame"));
        assert_eq!(back.data_dir.as_deref(), Some("/tmp/safetrack-dash"));
    }
}
