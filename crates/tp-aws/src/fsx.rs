//! FSx connector.
//!
//! Describes FSx file systems of every type (ONTAP, Windows, Lustre,
//! OpenZFS), their volumes, storage virtual machines, backups, and file
//! caches. FSx tags by ARN, so the connector remembers the ARN of every
//! resource it listed and resolves ids back to ARNs on write.

use crate::http::HttpClient;
use crate::traits::{ConnectorConfig, ConnectorError, ConnectorResult, StorageSource, TagSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tp_core::{ResourceKind, StorageListing, StorageListings, TagMap};
use tracing::{info, instrument};

/// FSx connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsxConfig {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// AWS region.
    pub region: String,
}

/// FSx connector for storage listings and tag writes.
pub struct FsxConnector {
    config: FsxConfig,
    client: HttpClient,
    /// Resource id → ARN, refreshed by every fetch.
    arns: RwLock<HashMap<String, String>>,
}

impl FsxConnector {
    /// Creates a new FSx connector.
    pub fn new(config: FsxConfig) -> ConnectorResult<Self> {
        let client = HttpClient::new(config.connector.clone())?;
        info!(region = %config.region, "FSx connector initialized");
        Ok(Self {
            config,
            client,
            arns: RwLock::new(HashMap::new()),
        })
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn display_name(tags: &[FsxTag], fallback: Option<&str>) -> Option<String> {
        tags.iter()
            .find(|t| t.key.eq_ignore_ascii_case("name") && !t.value.trim().is_empty())
            .map(|t| t.value.clone())
            .or_else(|| fallback.map(String::from))
    }
}

#[async_trait]
impl StorageSource for FsxConnector {
    #[instrument(skip(self), fields(region = %self.config.region))]
    async fn fetch_storage(&self) -> ConnectorResult<StorageListings> {
        let file_systems: DescribeFileSystemsResponse = self
            .client
            .post_json("/describe-file-systems", &json!({}))
            .await?;
        let volumes: DescribeVolumesResponse =
            self.client.post_json("/describe-volumes", &json!({})).await?;
        let svms: DescribeStorageVirtualMachinesResponse = self
            .client
            .post_json("/describe-storage-virtual-machines", &json!({}))
            .await?;
        let backups: DescribeBackupsResponse =
            self.client.post_json("/describe-backups", &json!({})).await?;
        let caches: DescribeFileCachesResponse = self
            .client
            .post_json("/describe-file-caches", &json!({}))
            .await?;

        let mut arns = HashMap::new();
        let mut entries = Vec::new();

        for fs in &file_systems.file_systems {
            arns.insert(fs.file_system_id.clone(), fs.resource_arn.clone());
            entries.push(StorageListing {
                id: fs.file_system_id.clone(),
                kind: ResourceKind::FileSystem,
                name: Self::display_name(&fs.tags, None),
                parent_id: None,
                existing_tags: tag_map(&fs.tags),
            });
        }

        for svm in &svms.storage_virtual_machines {
            arns.insert(svm.storage_virtual_machine_id.clone(), svm.resource_arn.clone());
            entries.push(StorageListing {
                id: svm.storage_virtual_machine_id.clone(),
                kind: ResourceKind::FsxStorageVm,
                name: Self::display_name(&svm.tags, svm.name.as_deref()),
                parent_id: Some(svm.file_system_id.clone()),
                existing_tags: tag_map(&svm.tags),
            });
        }

        for volume in &volumes.volumes {
            arns.insert(volume.volume_id.clone(), volume.resource_arn.clone());
            // ONTAP volumes hang off their storage VM; every other type
            // attaches directly to the file system.
            let parent_id = volume
                .ontap_configuration
                .as_ref()
                .and_then(|c| c.storage_virtual_machine_id.clone())
                .or_else(|| volume.file_system_id.clone());
            entries.push(StorageListing {
                id: volume.volume_id.clone(),
                kind: ResourceKind::FsxVolume,
                name: Self::display_name(&volume.tags, volume.name.as_deref()),
                parent_id,
                existing_tags: tag_map(&volume.tags),
            });
        }

        for backup in &backups.backups {
            arns.insert(backup.backup_id.clone(), backup.resource_arn.clone());
            let parent_id = backup
                .file_system
                .as_ref()
                .map(|f| f.file_system_id.clone())
                .or_else(|| backup.volume.as_ref().map(|v| v.volume_id.clone()));
            entries.push(StorageListing {
                id: backup.backup_id.clone(),
                kind: ResourceKind::FsxBackup,
                name: Self::display_name(&backup.tags, None),
                parent_id,
                existing_tags: tag_map(&backup.tags),
            });
        }

        for cache in &caches.file_caches {
            arns.insert(cache.file_cache_id.clone(), cache.resource_arn.clone());
            entries.push(StorageListing {
                id: cache.file_cache_id.clone(),
                kind: ResourceKind::FsxFileCache,
                name: Self::display_name(&cache.tags, None),
                parent_id: None,
                existing_tags: tag_map(&cache.tags),
            });
        }

        *self.arns.write().await = arns;
        Ok(StorageListings { entries })
    }
}

#[async_trait]
impl TagSink for FsxConnector {
    async fn write_tag(&self, resource_id: &str, key: &str, value: &str) -> ConnectorResult<()> {
        let arn = {
            let arns = self.arns.read().await;
            arns.get(resource_id).cloned()
        }
        .ok_or_else(|| {
            ConnectorError::NotFound(format!("no ARN known for FSx resource {}", resource_id))
        })?;

        let body = json!({
            "resourceARN": arn,
            "tags": [{ "key": key, "value": value }]
        });
        let response = self.client.post("/tag-resource", &body).await?;
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

fn tag_map(tags: &[FsxTag]) -> TagMap {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

// FSx API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxTag {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeFileSystemsResponse {
    #[serde(default)]
    file_systems: Vec<FsxFileSystem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxFileSystem {
    file_system_id: String,
    #[serde(rename = "resourceARN")]
    resource_arn: String,
    #[serde(default)]
    tags: Vec<FsxTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeVolumesResponse {
    #[serde(default)]
    volumes: Vec<FsxVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxVolume {
    volume_id: String,
    #[serde(rename = "resourceARN")]
    resource_arn: String,
    name: Option<String>,
    file_system_id: Option<String>,
    ontap_configuration: Option<FsxOntapVolumeConfig>,
    #[serde(default)]
    tags: Vec<FsxTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxOntapVolumeConfig {
    storage_virtual_machine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStorageVirtualMachinesResponse {
    #[serde(default)]
    storage_virtual_machines: Vec<FsxStorageVirtualMachine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxStorageVirtualMachine {
    storage_virtual_machine_id: String,
    file_system_id: String,
    #[serde(rename = "resourceARN")]
    resource_arn: String,
    name: Option<String>,
    #[serde(default)]
    tags: Vec<FsxTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeBackupsResponse {
    #[serde(default)]
    backups: Vec<FsxBackup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxBackup {
    backup_id: String,
    #[serde(rename = "resourceARN")]
    resource_arn: String,
    file_system: Option<FsxBackupFileSystem>,
    volume: Option<FsxBackupVolume>,
    #[serde(default)]
    tags: Vec<FsxTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxBackupFileSystem {
    file_system_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxBackupVolume {
    volume_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeFileCachesResponse {
    #[serde(default)]
    file_caches: Vec<FsxFileCache>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsxFileCache {
    file_cache_id: String,
    #[serde(rename = "resourceARN")]
    resource_arn: String,
    #[serde(default)]
    tags: Vec<FsxTag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_connector_config;

    #[test]
    fn test_connector_creation() {
        let config = FsxConfig {
            connector: test_connector_config("fsx-test", "https://fsx.us-west-2.amazonaws.com"),
            region: "us-west-2".to_string(),
        };
        let connector = FsxConnector::new(config);
        assert!(connector.is_ok());
    }

    #[test]
    fn test_ontap_volume_parents_to_svm() {
        let raw: FsxVolume = serde_json::from_value(json!({
            "volumeId": "fsvol-1",
            "resourceARN": "arn:aws:fsx:us-west-2:123:volume/fsvol-1",
            "fileSystemId": "fs-on",
            "ontapConfiguration": { "storageVirtualMachineId": "svm-1" }
        }))
        .unwrap();

        let parent = raw
            .ontap_configuration
            .as_ref()
            .and_then(|c| c.storage_virtual_machine_id.clone())
            .or_else(|| raw.file_system_id.clone());
        assert_eq!(parent.as_deref(), Some("svm-1"));
    }

    #[test]
    fn test_display_name_tag_beats_provider_name() {
        let tags = vec![FsxTag {
            key: "Name".to_string(),
            value: "ontap-prod".to_string(),
        }];
        assert_eq!(
            FsxConnector::display_name(&tags, Some("vol_root")).as_deref(),
            Some("ontap-prod")
        );
        assert_eq!(
            FsxConnector::display_name(&[], Some("vol_root")).as_deref(),
            Some("vol_root")
        );
        assert_eq!(FsxConnector::display_name(&[], None), None);
    }

    #[tokio::test]
    async fn test_write_tag_without_known_arn_fails() {
        let config = FsxConfig {
            connector: test_connector_config("fsx-test", "https://fsx.us-west-2.amazonaws.com"),
            region: "us-west-2".to_string(),
        };
        let connector = FsxConnector::new(config).unwrap();
        let result = connector.write_tag("fsvol-unknown", "key", "").await;
        assert!(matches!(result, Err(ConnectorError::NotFound(_))));
    }
}
