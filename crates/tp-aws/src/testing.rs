//! Testing harness for connector implementations.
//!
//! Provides in-memory sources and a recording sink so the execution
//! driver can be tested without any network.

use crate::traits::{
    AuthConfig, ComputeSource, ConnectorConfig, ConnectorError, ConnectorResult, RegionSource,
    StorageSource, TagSink,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tp_core::{ComputeListings, StorageListings};

/// Creates a test connector config with sensible defaults.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::None,
        timeout_secs: 30,
        max_retries: 0,
        headers: HashMap::new(),
    }
}

/// A compute source serving canned listings.
#[derive(Debug, Clone, Default)]
pub struct MockComputeSource {
    pub listings: ComputeListings,
}

impl MockComputeSource {
    pub fn new(listings: ComputeListings) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl ComputeSource for MockComputeSource {
    async fn fetch_compute(&self) -> ConnectorResult<ComputeListings> {
        Ok(self.listings.clone())
    }
}

/// A storage source serving canned listings.
#[derive(Debug, Clone, Default)]
pub struct MockStorageSource {
    pub listings: StorageListings,
}

impl MockStorageSource {
    pub fn new(listings: StorageListings) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl StorageSource for MockStorageSource {
    async fn fetch_storage(&self) -> ConnectorResult<StorageListings> {
        Ok(self.listings.clone())
    }
}

/// One tag write captured by [`RecordingTagSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub resource_id: String,
    pub key: String,
    pub value: String,
}

/// A tag sink that records writes instead of issuing them, optionally
/// failing for chosen resource ids.
#[derive(Debug, Default)]
pub struct RecordingTagSink {
    writes: Mutex<Vec<RecordedWrite>>,
    fail_for: HashSet<String>,
}

impl RecordingTagSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails `write_tag` for the given resource ids.
    pub fn failing_for(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail_for: ids.into_iter().collect(),
        }
    }

    /// Writes recorded so far.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl TagSink for RecordingTagSink {
    async fn write_tag(&self, resource_id: &str, key: &str, value: &str) -> ConnectorResult<()> {
        if self.fail_for.contains(resource_id) {
            return Err(ConnectorError::AuthorizationDenied(format!(
                "write denied for {}",
                resource_id
            )));
        }
        self.writes
            .lock()
            .expect("sink lock poisoned")
            .push(RecordedWrite {
                resource_id: resource_id.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            });
        Ok(())
    }
}

/// A region source serving a fixed list.
#[derive(Debug, Clone)]
pub struct StaticRegionSource {
    regions: Vec<String>,
}

impl StaticRegionSource {
    pub fn new(regions: Vec<String>) -> Self {
        Self { regions }
    }
}

#[async_trait]
impl RegionSource for StaticRegionSource {
    async fn list_regions(&self) -> ConnectorResult<Vec<String>> {
        Ok(self.regions.clone())
    }
}
