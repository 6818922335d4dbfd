//! Configuration Management
//!
//! Handles persistent configuration storage for cloudctl.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Default zone for zonal commands
    #[serde(default)]
    pub zone: Option<String>,
    /// Default region for regional commands
    #[serde(default)]
    pub region: Option<String>,
    /// Override for the API host (testing/staging endpoints)
    #[serde(default)]
    pub api_host: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudctl").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective default zone (config > gcloud default)
    pub fn effective_zone(&self) -> Option<String> {
        self.zone.clone().or_else(crate::gcp::auth::get_default_zone)
    }

    /// Get effective default region (config > gcloud default)
    pub fn effective_region(&self) -> Option<String> {
        self.region
            .clone()
            .or_else(crate::gcp::auth::get_default_region)
    }

    /// Get effective API host
    pub fn effective_api_host(&self) -> String {
        self.api_host
            .clone()
            .unwrap_or_else(|| crate::gcp::client::DEFAULT_API_HOST.to_string())
    }
}
