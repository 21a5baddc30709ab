//! Configuration loading for the tagging CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tp_core::{PropagationConfig, RegionSelection};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target regions. An empty list enables dynamic discovery through
    /// the provider API.
    #[serde(default = "default_region_list")]
    pub regions: Vec<String>,

    /// Decision-engine configuration (tag-key constraints, value policy,
    /// image correlation rule).
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Request timeout for provider calls, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for retryable provider failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Optional bearer token for the provider endpoints.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Maximum retained audit entries.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

fn default_region_list() -> Vec<String> {
    tp_aws::default_regions()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_audit_capacity() -> usize {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            regions: default_region_list(),
            propagation: PropagationConfig::default(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            api_token: None,
            audit_capacity: default_audit_capacity(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Region selection derived from the configured list.
    pub fn region_selection(&self) -> RegionSelection {
        RegionSelection::from_list(self.regions.clone())
    }
}
