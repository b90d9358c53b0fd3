use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HubConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub data_dir: String,
    pub fleet_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            bind_port: 3000,
            data_dir: "./data".into(),
            fleet_size: 5,
        }
    }
}

pub async fn load_config() -> HubConfig {
    let path = std::env::var("SAFETRACK_HUB_CONFIG").unwrap_or_else(|_| "hub.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return HubConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[hub] config invalide: {e}");
            HubConfig::default()
        })
    } else {
        eprintln!("[hub] pas de hub.yaml, usage config par défaut");
        HubConfig::default()
    }
}
