//! Resource data model for tag propagation.
//!
//! These types are the logical shapes the decision engine consumes, as
//! produced by the cloud description collaborators. They carry only what
//! the engine needs: identity, lifecycle state, derivation references,
//! and the tags already present on each resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tags already present on a resource, keyed by tag key.
///
/// A `BTreeMap` so that iteration order is deterministic across runs.
pub type TagMap = BTreeMap<String, String>;

/// Classification of a discoverable resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instance (EC2).
    Instance,
    /// Block-storage volume (EBS).
    Volume,
    /// Block-storage snapshot.
    Snapshot,
    /// Machine image (AMI).
    Image,
    /// Network file system (EFS or FSx filesystem).
    FileSystem,
    /// EFS mount target.
    MountTarget,
    /// EFS access point.
    AccessPoint,
    /// FSx volume.
    FsxVolume,
    /// FSx storage virtual machine.
    FsxStorageVm,
    /// FSx backup.
    FsxBackup,
    /// FSx file cache.
    FsxFileCache,
}

impl ResourceKind {
    /// Returns true for the kinds that belong to the storage forest.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            ResourceKind::FileSystem
                | ResourceKind::MountTarget
                | ResourceKind::AccessPoint
                | ResourceKind::FsxVolume
                | ResourceKind::FsxStorageVm
                | ResourceKind::FsxBackup
                | ResourceKind::FsxFileCache
        )
    }

    /// Returns true for the kinds that may root a storage tree.
    pub fn is_storage_root(&self) -> bool {
        matches!(self, ResourceKind::FileSystem | ResourceKind::FsxFileCache)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Instance => "Instance",
            ResourceKind::Volume => "Volume",
            ResourceKind::Snapshot => "Snapshot",
            ResourceKind::Image => "Image",
            ResourceKind::FileSystem => "FileSystem",
            ResourceKind::MountTarget => "MountTarget",
            ResourceKind::AccessPoint => "AccessPoint",
            ResourceKind::FsxVolume => "FSx Volume",
            ResourceKind::FsxStorageVm => "FSx SVM",
            ResourceKind::FsxBackup => "FSx Backup",
            ResourceKind::FsxFileCache => "FSx FileCache",
        };
        write!(f, "{}", s)
    }
}

/// Provider lifecycle state of a compute instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Running,
    Stopped,
    Terminated,
    /// Any other provider state (pending, stopping, shutting-down, ...).
    Other(String),
}

impl InstanceState {
    /// Parses a provider state string.
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => InstanceState::Running,
            "stopped" => InstanceState::Stopped,
            "terminated" => InstanceState::Terminated,
            other => InstanceState::Other(other.to_string()),
        }
    }

    /// Terminated instances never root a propagation tree.
    pub fn is_terminated(&self) -> bool {
        matches!(self, InstanceState::Terminated)
    }
}

/// A compute instance as listed for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceListing {
    /// Provider-assigned id (e.g. `i-0abc...`).
    pub id: String,
    /// Lifecycle state.
    pub state: InstanceState,
    /// Human-assigned display name (the `Name` tag value), if any.
    pub name: Option<String>,
    /// Ids of volumes attached via block device mappings.
    #[serde(default)]
    pub volume_ids: Vec<String>,
    /// Tags currently on the instance.
    #[serde(default)]
    pub existing_tags: TagMap,
}

/// A block-storage volume as listed for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeListing {
    pub id: String,
    /// Instance the volume is currently attached to, if any.
    pub attached_instance_id: Option<String>,
    #[serde(default)]
    pub existing_tags: TagMap,
}

/// A volume snapshot as listed for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotListing {
    pub id: String,
    /// Volume the snapshot was taken from, if recorded.
    pub source_volume_id: Option<String>,
    /// Free-form description; may embed instance or image ids.
    pub description: Option<String>,
    #[serde(default)]
    pub existing_tags: TagMap,
}

/// A machine image as listed for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListing {
    pub id: String,
    /// Instance the image was created from, when that provenance exists.
    pub source_instance_id: Option<String>,
    /// Snapshots backing this image.
    #[serde(default)]
    pub backing_snapshot_ids: Vec<String>,
    /// Image name field.
    pub name: Option<String>,
    /// Free-form description; may embed the source instance id.
    pub description: Option<String>,
    #[serde(default)]
    pub existing_tags: TagMap,
}

/// A storage-service resource (EFS / FSx family), uniform across sub-kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageListing {
    pub id: String,
    pub kind: ResourceKind,
    /// Display name (the `Name` tag value or provider name field), if any.
    pub name: Option<String>,
    /// Owning resource id for sub-resources; `None` for roots.
    pub parent_id: Option<String>,
    #[serde(default)]
    pub existing_tags: TagMap,
}

/// All compute-side listings for a single region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeListings {
    pub instances: Vec<InstanceListing>,
    pub volumes: Vec<VolumeListing>,
    pub snapshots: Vec<SnapshotListing>,
    pub images: Vec<ImageListing>,
}

/// All storage-side listings for a single region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageListings {
    pub entries: Vec<StorageListing>,
}
