//! EC2 connector.
//!
//! Describes instances, volumes, snapshots, and images for one region and
//! writes tags back through `CreateTags`.

use crate::http::HttpClient;
use crate::traits::{
    ComputeSource, ConnectorConfig, ConnectorError, ConnectorResult, RegionSource, TagSink,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tp_core::{
    ComputeListings, ImageListing, InstanceListing, InstanceState, SnapshotListing, TagMap,
    VolumeListing,
};
use tracing::{info, instrument};

/// The display-name tag key on EC2 resources.
const NAME_TAG: &str = "Name";

/// EC2 connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ec2Config {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// AWS region (e.g. "us-east-1").
    pub region: String,
}

/// EC2 connector for compute listings and tag writes.
pub struct Ec2Connector {
    config: Ec2Config,
    client: HttpClient,
}

impl Ec2Connector {
    /// Creates a new EC2 connector.
    pub fn new(config: Ec2Config) -> ConnectorResult<Self> {
        let client = HttpClient::new(config.connector.clone())?;
        info!(region = %config.region, "EC2 connector initialized");
        Ok(Self { config, client })
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn parse_instance(raw: &Ec2Instance) -> InstanceListing {
        let existing_tags = tag_map(&raw.tags);
        let name = raw
            .tags
            .iter()
            .find(|t| t.key == NAME_TAG && !t.value.trim().is_empty())
            .map(|t| t.value.clone());
        let volume_ids = raw
            .block_device_mappings
            .iter()
            .filter_map(|m| m.ebs.as_ref())
            .map(|e| e.volume_id.clone())
            .filter(|v| !v.is_empty())
            .collect();
        InstanceListing {
            id: raw.instance_id.clone(),
            state: InstanceState::parse(&raw.state.name),
            name,
            volume_ids,
            existing_tags,
        }
    }

    fn parse_volume(raw: &Ec2Volume) -> VolumeListing {
        VolumeListing {
            id: raw.volume_id.clone(),
            attached_instance_id: raw
                .attachments
                .iter()
                .find_map(|a| a.instance_id.clone()),
            existing_tags: tag_map(&raw.tags),
        }
    }

    fn parse_snapshot(raw: &Ec2Snapshot) -> SnapshotListing {
        SnapshotListing {
            id: raw.snapshot_id.clone(),
            source_volume_id: raw.volume_id.clone(),
            description: raw.description.clone(),
            existing_tags: tag_map(&raw.tags),
        }
    }

    fn parse_image(raw: &Ec2Image) -> ImageListing {
        let backing_snapshot_ids = raw
            .block_device_mappings
            .iter()
            .filter_map(|m| m.ebs.as_ref())
            .filter_map(|e| e.snapshot_id.clone())
            .collect();
        ImageListing {
            id: raw.image_id.clone(),
            source_instance_id: raw.source_instance_id.clone(),
            backing_snapshot_ids,
            name: raw.name.clone(),
            description: raw.description.clone(),
            existing_tags: tag_map(&raw.tags),
        }
    }
}

#[async_trait]
impl ComputeSource for Ec2Connector {
    #[instrument(skip(self), fields(region = %self.config.region))]
    async fn fetch_compute(&self) -> ConnectorResult<ComputeListings> {
        let instances: DescribeInstancesResponse =
            self.client.post_json("/describe-instances", &json!({})).await?;
        let volumes: DescribeVolumesResponse =
            self.client.post_json("/describe-volumes", &json!({})).await?;
        let snapshots: DescribeSnapshotsResponse = self
            .client
            .post_json("/describe-snapshots", &json!({ "ownerIds": ["self"] }))
            .await?;
        let images: DescribeImagesResponse = self
            .client
            .post_json("/describe-images", &json!({ "owners": ["self"] }))
            .await?;

        Ok(ComputeListings {
            instances: instances.instances.iter().map(Self::parse_instance).collect(),
            volumes: volumes.volumes.iter().map(Self::parse_volume).collect(),
            snapshots: snapshots.snapshots.iter().map(Self::parse_snapshot).collect(),
            images: images.images.iter().map(Self::parse_image).collect(),
        })
    }
}

#[async_trait]
impl TagSink for Ec2Connector {
    async fn write_tag(&self, resource_id: &str, key: &str, value: &str) -> ConnectorResult<()> {
        let body = json!({
            "resources": [resource_id],
            "tags": [{ "key": key, "value": value }]
        });
        let response = self.client.post("/create-tags", &body).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::RequestFailed(format!(
                "CreateTags failed for {}: {}",
                resource_id, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RegionSource for Ec2Connector {
    async fn list_regions(&self) -> ConnectorResult<Vec<String>> {
        let response: DescribeRegionsResponse =
            self.client.post_json("/describe-regions", &json!({})).await?;
        Ok(response.regions.into_iter().map(|r| r.region_name).collect())
    }
}

fn tag_map(tags: &[Ec2Tag]) -> TagMap {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

// EC2 API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Tag {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Instance {
    instance_id: String,
    state: Ec2InstanceState,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
    #[serde(default)]
    block_device_mappings: Vec<Ec2BlockDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2InstanceState {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2BlockDevice {
    ebs: Option<Ec2BlockDeviceEbs>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2BlockDeviceEbs {
    #[serde(default)]
    volume_id: String,
    snapshot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeVolumesResponse {
    #[serde(default)]
    volumes: Vec<Ec2Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Volume {
    volume_id: String,
    #[serde(default)]
    attachments: Vec<Ec2Attachment>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Attachment {
    instance_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeSnapshotsResponse {
    #[serde(default)]
    snapshots: Vec<Ec2Snapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Snapshot {
    snapshot_id: String,
    volume_id: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeImagesResponse {
    #[serde(default)]
    images: Vec<Ec2Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Image {
    image_id: String,
    source_instance_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
    #[serde(default)]
    block_device_mappings: Vec<Ec2BlockDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeRegionsResponse {
    #[serde(default)]
    regions: Vec<Ec2Region>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ec2Region {
    region_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_connector_config;

    fn create_test_config() -> Ec2Config {
        Ec2Config {
            connector: test_connector_config("ec2-test", "https://ec2.us-east-1.amazonaws.com"),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_connector_creation() {
        let connector = Ec2Connector::new(create_test_config());
        assert!(connector.is_ok());
        assert_eq!(connector.unwrap().region(), "us-east-1");
    }

    #[test]
    fn test_parse_instance_with_name_and_volumes() {
        let raw: Ec2Instance = serde_json::from_value(json!({
            "instanceId": "i-0abc12345678",
            "state": { "name": "running" },
            "tags": [
                { "key": "Name", "value": "web-01" },
                { "key": "env", "value": "prod" }
            ],
            "blockDeviceMappings": [
                { "ebs": { "volumeId": "vol-1" } },
                { "ebs": null }
            ]
        }))
        .unwrap();

        let listing = Ec2Connector::parse_instance(&raw);
        assert_eq!(listing.id, "i-0abc12345678");
        assert_eq!(listing.state, InstanceState::Running);
        assert_eq!(listing.name.as_deref(), Some("web-01"));
        assert_eq!(listing.volume_ids, vec!["vol-1".to_string()]);
        assert_eq!(listing.existing_tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_parse_instance_blank_name_tag_ignored() {
        let raw: Ec2Instance = serde_json::from_value(json!({
            "instanceId": "i-1",
            "state": { "name": "stopped" },
            "tags": [{ "key": "Name", "value": "   " }]
        }))
        .unwrap();

        let listing = Ec2Connector::parse_instance(&raw);
        assert_eq!(listing.name, None);
    }

    #[test]
    fn test_parse_image_backing_snapshots() {
        let raw: Ec2Image = serde_json::from_value(json!({
            "imageId": "ami-1",
            "name": "web-01-golden",
            "blockDeviceMappings": [
                { "ebs": { "volumeId": "", "snapshotId": "snap-a" } },
                { "ebs": { "volumeId": "", "snapshotId": "snap-b" } }
            ]
        }))
        .unwrap();

        let listing = Ec2Connector::parse_image(&raw);
        assert_eq!(
            listing.backing_snapshot_ids,
            vec!["snap-a".to_string(), "snap-b".to_string()]
        );
    }

    #[test]
    fn test_parse_volume_attachment() {
        let raw: Ec2Volume = serde_json::from_value(json!({
            "volumeId": "vol-1",
            "attachments": [{ "instanceId": "i-1" }]
        }))
        .unwrap();

        let listing = Ec2Connector::parse_volume(&raw);
        assert_eq!(listing.attached_instance_id.as_deref(), Some("i-1"));
    }
}
