//! EFS connector.
//!
//! Describes file systems, mount targets, and access points for one
//! region and writes tags back through `TagResource` by resource id.

use crate::http::HttpClient;
use crate::traits::{ConnectorConfig, ConnectorError, ConnectorResult, StorageSource, TagSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tp_core::{ResourceKind, StorageListing, StorageListings, TagMap};
use tracing::{info, instrument};

const API_VERSION: &str = "2015-02-01";

/// EFS connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfsConfig {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// AWS region.
    pub region: String,
}

/// EFS connector for storage listings and tag writes.
pub struct EfsConnector {
    config: EfsConfig,
    client: HttpClient,
}

impl EfsConnector {
    /// Creates a new EFS connector.
    pub fn new(config: EfsConfig) -> ConnectorResult<Self> {
        let client = HttpClient::new(config.connector.clone())?;
        info!(region = %config.region, "EFS connector initialized");
        Ok(Self { config, client })
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn filesystem_listing(raw: &EfsFileSystem) -> StorageListing {
        let existing_tags = tag_map(&raw.tags);
        // The display name comes from a Name tag (any casing) or the
        // provider name field.
        let name = raw
            .tags
            .iter()
            .find(|t| t.key.eq_ignore_ascii_case("name") && !t.value.trim().is_empty())
            .map(|t| t.value.clone())
            .or_else(|| raw.name.clone());
        StorageListing {
            id: raw.file_system_id.clone(),
            kind: ResourceKind::FileSystem,
            name,
            parent_id: None,
            existing_tags,
        }
    }
}

#[async_trait]
impl StorageSource for EfsConnector {
    #[instrument(skip(self), fields(region = %self.config.region))]
    async fn fetch_storage(&self) -> ConnectorResult<StorageListings> {
        let path = format!("/{}/file-systems", API_VERSION);
        let response: DescribeFileSystemsResponse = self.client.get_json(&path).await?;

        let mut entries = Vec::new();
        for fs in &response.file_systems {
            entries.push(Self::filesystem_listing(fs));

            let ap_path = format!(
                "/{}/access-points?FileSystemId={}",
                API_VERSION, fs.file_system_id
            );
            let access_points: DescribeAccessPointsResponse =
                self.client.get_json(&ap_path).await?;
            for ap in access_points.access_points {
                entries.push(StorageListing {
                    id: ap.access_point_id,
                    kind: ResourceKind::AccessPoint,
                    name: ap.name,
                    parent_id: Some(fs.file_system_id.clone()),
                    existing_tags: tag_map(&ap.tags),
                });
            }

            let mt_path = format!(
                "/{}/mount-targets?FileSystemId={}",
                API_VERSION, fs.file_system_id
            );
            let mount_targets: DescribeMountTargetsResponse =
                self.client.get_json(&mt_path).await?;
            for mt in mount_targets.mount_targets {
                entries.push(StorageListing {
                    id: mt.mount_target_id,
                    kind: ResourceKind::MountTarget,
                    name: None,
                    parent_id: Some(fs.file_system_id.clone()),
                    existing_tags: TagMap::new(),
                });
            }
        }

        Ok(StorageListings { entries })
    }
}

#[async_trait]
impl TagSink for EfsConnector {
    async fn write_tag(&self, resource_id: &str, key: &str, value: &str) -> ConnectorResult<()> {
        let path = format!("/{}/resource-tags/{}", API_VERSION, resource_id);
        let body = json!({ "tags": [{ "key": key, "value": value }] });
        let response = self.client.post(&path, &body).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::RequestFailed(format!(
                "TagResource failed for {}: {}",
                resource_id, body
            )));
        }
        Ok(())
    }
}

fn tag_map(tags: &[EfsTag]) -> TagMap {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

// EFS API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EfsTag {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeFileSystemsResponse {
    #[serde(default)]
    file_systems: Vec<EfsFileSystem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EfsFileSystem {
    file_system_id: String,
    name: Option<String>,
    #[serde(default)]
    tags: Vec<EfsTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeAccessPointsResponse {
    #[serde(default)]
    access_points: Vec<EfsAccessPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EfsAccessPoint {
    access_point_id: String,
    name: Option<String>,
    #[serde(default)]
    tags: Vec<EfsTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeMountTargetsResponse {
    #[serde(default)]
    mount_targets: Vec<EfsMountTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EfsMountTarget {
    mount_target_id: String,
}
