//! Compute-side ownership graph.
//!
//! Builds the forest rooted at live compute instances:
//! instance → attached volumes → their snapshots, and
//! instance → images → their backing snapshots.

use crate::config::ImageCorrelation;
use crate::graph::{Forest, GraphIssue, Node, Tree};
use crate::resource::{ComputeListings, ImageListing, ResourceKind, SnapshotListing};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// The ownership forest for one region's compute resources.
///
/// Terminated instances never create roots; their leftover snapshots and
/// images are the orphan classifier's concern. The claimed set records
/// every resource attached to some tree so that a resource reachable from
/// two roots is attached exactly once, to the first root in iteration
/// order.
#[derive(Debug, Clone)]
pub struct ComputeGraph {
    pub forest: Forest,
    /// Non-fatal problems found while building.
    pub issues: Vec<GraphIssue>,
    claimed: HashSet<String>,
    live_instances: HashSet<String>,
    /// Volume id → instance id recorded in the listings, live or not.
    /// Lets the orphan classifier resolve snapshot lineage through
    /// terminated instances.
    volume_attachments: HashMap<String, String>,
}

impl ComputeGraph {
    /// Builds the forest from one region's listings.
    ///
    /// Pure transformation: no network, no side effects beyond logging.
    pub fn build(listings: &ComputeListings, correlation: ImageCorrelation) -> Self {
        let live_instances: HashSet<String> = listings
            .instances
            .iter()
            .filter(|i| !i.state.is_terminated())
            .map(|i| i.id.clone())
            .collect();

        let mut snaps_by_volume: HashMap<&str, Vec<&SnapshotListing>> = HashMap::new();
        for snap in &listings.snapshots {
            if let Some(vol_id) = snap.source_volume_id.as_deref() {
                snaps_by_volume.entry(vol_id).or_default().push(snap);
            }
        }
        let snap_by_id: HashMap<&str, &SnapshotListing> = listings
            .snapshots
            .iter()
            .map(|s| (s.id.as_str(), s))
            .collect();

        let mut volume_attachments: HashMap<String, String> = HashMap::new();
        for volume in &listings.volumes {
            if let Some(instance_id) = &volume.attached_instance_id {
                volume_attachments.insert(volume.id.clone(), instance_id.clone());
            }
        }
        for instance in &listings.instances {
            for volume_id in &instance.volume_ids {
                volume_attachments
                    .entry(volume_id.clone())
                    .or_insert_with(|| instance.id.clone());
            }
        }

        let mut claimed: HashSet<String> = HashSet::new();
        let mut issues: Vec<GraphIssue> = Vec::new();
        let mut trees: Vec<Tree> = Vec::new();

        for instance in &listings.instances {
            if instance.state.is_terminated() {
                debug!(instance_id = %instance.id, "terminated instance excluded from roots");
                continue;
            }
            claimed.insert(instance.id.clone());
            let mut root = Node::new(
                &instance.id,
                ResourceKind::Instance,
                instance.existing_tags.clone(),
            );

            for volume in &listings.volumes {
                let attached = volume.attached_instance_id.as_deref() == Some(&instance.id)
                    || instance.volume_ids.iter().any(|v| v == &volume.id);
                if !attached {
                    continue;
                }
                if !claimed.insert(volume.id.clone()) {
                    debug!(volume_id = %volume.id, "volume already claimed by earlier root");
                    continue;
                }
                let mut vol_node =
                    Node::new(&volume.id, ResourceKind::Volume, volume.existing_tags.clone());
                for snap in snaps_by_volume.get(volume.id.as_str()).into_iter().flatten() {
                    if claimed.insert(snap.id.clone()) {
                        vol_node.children.push(Node::new(
                            &snap.id,
                            ResourceKind::Snapshot,
                            snap.existing_tags.clone(),
                        ));
                    }
                }
                root.children.push(vol_node);
            }

            for image in &listings.images {
                if !image_from_instance(image, &instance.id, correlation) {
                    continue;
                }
                if !claimed.insert(image.id.clone()) {
                    debug!(image_id = %image.id, "image already claimed by earlier root");
                    continue;
                }
                let mut img_node =
                    Node::new(&image.id, ResourceKind::Image, image.existing_tags.clone());
                for snap_id in &image.backing_snapshot_ids {
                    match snap_by_id.get(snap_id.as_str()) {
                        Some(snap) => {
                            if claimed.insert(snap.id.clone()) {
                                img_node.children.push(Node::new(
                                    &snap.id,
                                    ResourceKind::Snapshot,
                                    snap.existing_tags.clone(),
                                ));
                            }
                        }
                        None => {
                            debug!(
                                image_id = %image.id,
                                snapshot_id = %snap_id,
                                "backing snapshot not present in listings"
                            );
                        }
                    }
                }
                root.children.push(img_node);
            }

            // Snapshots created alongside an image carry the instance id in
            // their description even when no volume or image links them.
            if correlation == ImageCorrelation::DescriptionFallback {
                for snap in &listings.snapshots {
                    if claimed.contains(&snap.id) {
                        continue;
                    }
                    let mentions = snap
                        .description
                        .as_deref()
                        .is_some_and(|d| d.contains(&instance.id));
                    if mentions && claimed.insert(snap.id.clone()) {
                        root.children.push(Node::new(
                            &snap.id,
                            ResourceKind::Snapshot,
                            snap.existing_tags.clone(),
                        ));
                    }
                }
            }

            trees.push(Tree {
                source_name: instance.name.clone(),
                root,
            });
        }

        // Volumes pointing at an instance id the listings never mention.
        let all_instance_ids: HashSet<&str> =
            listings.instances.iter().map(|i| i.id.as_str()).collect();
        for volume in &listings.volumes {
            if let Some(instance_id) = volume.attached_instance_id.as_deref() {
                if !all_instance_ids.contains(instance_id) {
                    warn!(
                        volume_id = %volume.id,
                        instance_id = %instance_id,
                        "volume attached to instance absent from listings"
                    );
                    issues.push(GraphIssue::Inconsistency {
                        subject_id: volume.id.clone(),
                        parent_id: instance_id.to_string(),
                    });
                }
            }
        }

        Self {
            forest: Forest { trees },
            issues,
            claimed,
            live_instances,
            volume_attachments,
        }
    }

    /// Ids of instances eligible to root a tree.
    pub fn live_instance_ids(&self) -> &HashSet<String> {
        &self.live_instances
    }

    /// Every resource id attached to some tree in this forest.
    pub fn claimed_ids(&self) -> &HashSet<String> {
        &self.claimed
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    /// Instance the given volume was recorded as attached to, if any.
    pub fn volume_attachment(&self, volume_id: &str) -> Option<&str> {
        self.volume_attachments.get(volume_id).map(String::as_str)
    }
}

fn image_from_instance(
    image: &ImageListing,
    instance_id: &str,
    correlation: ImageCorrelation,
) -> bool {
    if image.source_instance_id.as_deref() == Some(instance_id) {
        return true;
    }
    if correlation == ImageCorrelation::DescriptionFallback {
        return image
            .description
            .as_deref()
            .is_some_and(|d| d.contains(instance_id))
            || image.name.as_deref().is_some_and(|n| n.contains(instance_id));
    }
    false
}
