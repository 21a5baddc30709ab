//! Orphan classification.
//!
//! Snapshots and images whose originating instance no longer exists are
//! invisible to lineage propagation: the compute graph only roots at live
//! instances. This classifier finds them and plans a tag write from the
//! best available lineage hint.
//!
//! Mutual exclusion with the compute graph is enforced through the graph's
//! claimed set: a resource attached to any live root is never an orphan
//! candidate, so the two passes partition the snapshot population.

use crate::graph::ComputeGraph;
use crate::normalize::{normalize, TagKeyConstraints};
use crate::planner::{PlanAction, TagPlanEntry, TagValuePolicy};
use crate::resource::{ImageListing, ResourceKind, SnapshotListing, TagMap};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// The conventional display-name tag key.
const NAME_TAG: &str = "Name";

/// Classifies orphaned snapshots and images and plans their tag writes.
pub struct OrphanClassifier {
    constraints: TagKeyConstraints,
    policy: TagValuePolicy,
    instance_id_re: Regex,
    image_id_re: Regex,
}

impl OrphanClassifier {
    pub fn new(constraints: TagKeyConstraints, policy: TagValuePolicy) -> Self {
        Self {
            constraints,
            policy,
            instance_id_re: Regex::new(r"\bi-[0-9a-f]{8,17}\b").expect("static pattern"),
            image_id_re: Regex::new(r"\bami-[0-9a-f]{8,17}\b").expect("static pattern"),
        }
    }

    /// Plans tag writes for orphaned snapshots and images.
    ///
    /// A resource is an orphan candidate when it is not claimed by the
    /// compute graph and every instance its recorded provenance resolves
    /// to (volume attachment, direct source field, or ids embedded in its
    /// description) is absent from the live set. A candidate that already
    /// carries the computed key is not an orphan and produces no entry;
    /// one with no recoverable name yields a skip entry, reported rather
    /// than fatal.
    pub fn classify(
        &self,
        snapshots: &[SnapshotListing],
        images: &[ImageListing],
        graph: &ComputeGraph,
    ) -> Vec<TagPlanEntry> {
        let live = graph.live_instance_ids();
        let image_by_id: HashMap<&str, &ImageListing> =
            images.iter().map(|i| (i.id.as_str(), i)).collect();
        let mut image_backing: HashMap<&str, &ImageListing> = HashMap::new();
        for image in images {
            for snap_id in &image.backing_snapshot_ids {
                image_backing.entry(snap_id.as_str()).or_insert(image);
            }
        }

        let mut entries = Vec::new();

        for snap in snapshots {
            if graph.is_claimed(&snap.id) {
                continue;
            }

            let mut has_provenance = false;
            let mut references_live = false;
            let mut lineage_images: Vec<&ImageListing> = Vec::new();

            if let Some(volume_id) = snap.source_volume_id.as_deref() {
                // A recorded source volume is provenance even when the
                // volume itself has vanished from the listings.
                has_provenance = true;
                if let Some(instance_id) = graph.volume_attachment(volume_id) {
                    references_live |= live.contains(instance_id);
                }
            }

            if let Some(desc) = snap.description.as_deref() {
                for m in self.instance_id_re.find_iter(desc) {
                    has_provenance = true;
                    references_live |= live.contains(m.as_str());
                }
                for m in self.image_id_re.find_iter(desc) {
                    if let Some(&image) = image_by_id.get(m.as_str()) {
                        has_provenance = true;
                        lineage_images.push(image);
                    }
                }
            }
            if let Some(&image) = image_backing.get(snap.id.as_str()) {
                has_provenance = true;
                lineage_images.push(image);
            }
            for image in &lineage_images {
                if let Some(instance_id) = image.source_instance_id.as_deref() {
                    references_live |= live.contains(instance_id);
                }
            }

            if !has_provenance || references_live {
                continue;
            }

            let hint = lineage_images
                .iter()
                .find_map(|img| image_name(img))
                .or_else(|| snap.description.clone());
            entries.extend(self.entry_for(
                &snap.id,
                ResourceKind::Snapshot,
                &snap.existing_tags,
                hint.as_deref(),
            ));
        }

        for image in images {
            if graph.is_claimed(&image.id) {
                continue;
            }

            let mut has_provenance = false;
            let mut references_live = false;
            if let Some(instance_id) = image.source_instance_id.as_deref() {
                has_provenance = true;
                references_live |= live.contains(instance_id);
            }
            if let Some(desc) = image.description.as_deref() {
                for m in self.instance_id_re.find_iter(desc) {
                    has_provenance = true;
                    references_live |= live.contains(m.as_str());
                }
            }

            if !has_provenance || references_live {
                continue;
            }

            let hint = image_name(image);
            entries.extend(self.entry_for(
                &image.id,
                ResourceKind::Image,
                &image.existing_tags,
                hint.as_deref(),
            ));
        }

        entries
    }

    /// Plans one orphan entry, or nothing when the resource already
    /// carries the computed key.
    fn entry_for(
        &self,
        resource_id: &str,
        kind: ResourceKind,
        existing_tags: &TagMap,
        hint: Option<&str>,
    ) -> Option<TagPlanEntry> {
        match hint.map(|h| normalize(h, &self.constraints)) {
            Some(Ok(key)) => {
                if existing_tags.contains_key(key.as_str()) {
                    debug!(resource_id, key = %key, "orphan already carries the key");
                    return None;
                }
                let value = self.policy.value_for(&key);
                Some(TagPlanEntry {
                    resource_id: resource_id.to_string(),
                    kind,
                    key: Some(key),
                    value,
                    action: PlanAction::Write,
                })
            }
            _ => Some(TagPlanEntry {
                resource_id: resource_id.to_string(),
                kind,
                key: None,
                value: String::new(),
                action: PlanAction::SkipNoSourceName,
            }),
        }
    }
}

fn image_name(image: &ImageListing) -> Option<String> {
    image
        .existing_tags
        .get(NAME_TAG)
        .cloned()
        .or_else(|| image.name.clone())
}
