//! Integration tests for the propagation engine.
//!
//! These exercise the full pipeline (listings → graph → plan → orphan
//! classification) and its contract properties: idempotence across
//! refreshed listings, determinism, the snapshot partition between
//! lineage planning and orphan classification, and the no-overwrite rule.

use std::collections::HashSet;

use tp_core::{
    plan, ComputeGraph, ComputeListings, ImageCorrelation, ImageListing, InstanceListing,
    InstanceState, OrphanClassifier, PlanAction, SnapshotListing, StorageGraph, StorageListing,
    StorageListings, TagKeyConstraints, TagMap, TagPlanEntry, TagValuePolicy, VolumeListing,
};

fn instance(id: &str, name: Option<&str>, state: InstanceState) -> InstanceListing {
    InstanceListing {
        id: id.to_string(),
        state,
        name: name.map(String::from),
        volume_ids: Vec::new(),
        existing_tags: TagMap::new(),
    }
}

fn volume(id: &str, attached: Option<&str>) -> VolumeListing {
    VolumeListing {
        id: id.to_string(),
        attached_instance_id: attached.map(String::from),
        existing_tags: TagMap::new(),
    }
}

fn snapshot(id: &str, vol: Option<&str>, description: Option<&str>) -> SnapshotListing {
    SnapshotListing {
        id: id.to_string(),
        source_volume_id: vol.map(String::from),
        description: description.map(String::from),
        existing_tags: TagMap::new(),
    }
}

fn plan_all(listings: &ComputeListings) -> Vec<TagPlanEntry> {
    let graph = ComputeGraph::build(listings, ImageCorrelation::default());
    plan(
        &graph.forest,
        &TagKeyConstraints::default(),
        TagValuePolicy::default(),
    )
    .collect()
}

/// Applies every WRITE entry back onto the listings, simulating a
/// successful apply pass followed by a fresh describe.
fn apply_writes(listings: &mut ComputeListings, entries: &[TagPlanEntry]) {
    for entry in entries.iter().filter(|e| e.is_write()) {
        let key = entry.key.as_ref().unwrap().as_str().to_string();
        let tags: &mut TagMap = if let Some(i) =
            listings.instances.iter_mut().find(|i| i.id == entry.resource_id)
        {
            &mut i.existing_tags
        } else if let Some(v) = listings.volumes.iter_mut().find(|v| v.id == entry.resource_id) {
            &mut v.existing_tags
        } else if let Some(s) = listings
            .snapshots
            .iter_mut()
            .find(|s| s.id == entry.resource_id)
        {
            &mut s.existing_tags
        } else {
            continue;
        };
        tags.insert(key, entry.value.clone());
    }
}

#[test]
fn scenario_a_running_instance_with_volume() {
    let listings = ComputeListings {
        instances: vec![instance("i-1", Some("web-01"), InstanceState::Running)],
        volumes: vec![volume("vol-1", Some("i-1"))],
        snapshots: Vec::new(),
        images: Vec::new(),
    };

    let entries = plan_all(&listings);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].resource_id, "i-1");
    assert_eq!(entries[0].key.as_ref().unwrap().as_str(), "web-01");
    assert_eq!(entries[0].value, "");
    assert_eq!(entries[0].action, PlanAction::Write);
    assert_eq!(entries[1].resource_id, "vol-1");
    assert_eq!(entries[1].key.as_ref().unwrap().as_str(), "web-01");
    assert_eq!(entries[1].action, PlanAction::Write);
}

#[test]
fn scenario_b_terminated_instance_snapshot_goes_to_classifier() {
    let listings = ComputeListings {
        instances: vec![instance("i-2", Some("db-02"), InstanceState::Terminated)],
        volumes: vec![volume("vol-2", Some("i-2"))],
        snapshots: vec![snapshot("snap-2", Some("vol-2"), Some("db-02"))],
        images: Vec::new(),
    };

    let graph = ComputeGraph::build(&listings, ImageCorrelation::default());
    assert!(graph.forest.trees.is_empty());

    let classifier =
        OrphanClassifier::new(TagKeyConstraints::default(), TagValuePolicy::default());
    let entries = classifier.classify(&listings.snapshots, &listings.images, &graph);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource_id, "snap-2");
    assert_eq!(entries[0].key.as_ref().unwrap().as_str(), "db-02");
    assert_eq!(entries[0].value, "");
    assert_eq!(entries[0].action, PlanAction::Write);
}

#[test]
fn scenario_c_nameless_instance_skips_descendants() {
    let listings = ComputeListings {
        instances: vec![instance("i-3", Some(""), InstanceState::Running)],
        volumes: vec![volume("vol-3", Some("i-3"))],
        snapshots: vec![snapshot("snap-3", Some("vol-3"), None)],
        images: Vec::new(),
    };

    let entries = plan_all(&listings);

    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .all(|e| e.action == PlanAction::SkipNoSourceName && e.key.is_none()));
}

#[test]
fn scenario_d_existing_key_is_never_overwritten() {
    let mut vol = volume("vol-4", Some("i-4"));
    vol.existing_tags
        .insert("Name".to_string(), "legacy".to_string());
    let listings = ComputeListings {
        instances: vec![instance("i-4", Some("Name"), InstanceState::Running)],
        volumes: vec![vol],
        snapshots: Vec::new(),
        images: Vec::new(),
    };

    let entries = plan_all(&listings);

    let vol_entry = entries.iter().find(|e| e.resource_id == "vol-4").unwrap();
    assert_eq!(vol_entry.action, PlanAction::SkipAlreadyTagged);
}

#[test]
fn property_idempotence_after_apply() {
    let mut listings = ComputeListings {
        instances: vec![
            instance("i-1", Some("web-01"), InstanceState::Running),
            instance("i-5", Some("worker 5"), InstanceState::Stopped),
        ],
        volumes: vec![volume("vol-1", Some("i-1")), volume("vol-5", Some("i-5"))],
        snapshots: vec![snapshot("snap-1", Some("vol-1"), None)],
        images: Vec::new(),
    };

    let first = plan_all(&listings);
    assert!(first.iter().any(|e| e.is_write()));

    apply_writes(&mut listings, &first);
    let second = plan_all(&listings);

    assert!(second.iter().all(|e| !e.is_write()));
    assert!(second
        .iter()
        .all(|e| e.action == PlanAction::SkipAlreadyTagged));
}

#[test]
fn property_determinism() {
    let listings = ComputeListings {
        instances: vec![
            instance("i-1", Some("alpha"), InstanceState::Running),
            instance("i-2", Some("beta"), InstanceState::Running),
        ],
        volumes: vec![
            volume("vol-1", Some("i-1")),
            volume("vol-2", Some("i-2")),
            volume("vol-3", Some("i-1")),
        ],
        snapshots: vec![
            snapshot("snap-1", Some("vol-1"), None),
            snapshot("snap-2", Some("vol-3"), None),
        ],
        images: Vec::new(),
    };

    assert_eq!(plan_all(&listings), plan_all(&listings));
}

#[test]
fn property_snapshot_partition() {
    // One snapshot reachable from a live root, one orphaned by a
    // terminated instance: every snapshot lands in exactly one pass.
    let listings = ComputeListings {
        instances: vec![
            instance("i-1", Some("web-01"), InstanceState::Running),
            instance("i-2", Some("db-02"), InstanceState::Terminated),
        ],
        volumes: vec![volume("vol-1", Some("i-1")), volume("vol-2", Some("i-2"))],
        snapshots: vec![
            snapshot("snap-1", Some("vol-1"), None),
            snapshot("snap-2", Some("vol-2"), Some("db-02")),
        ],
        images: Vec::new(),
    };

    let graph = ComputeGraph::build(&listings, ImageCorrelation::default());
    let lineage: HashSet<String> = plan(
        &graph.forest,
        &TagKeyConstraints::default(),
        TagValuePolicy::default(),
    )
    .filter(|e| e.kind == tp_core::ResourceKind::Snapshot)
    .map(|e| e.resource_id)
    .collect();

    let classifier =
        OrphanClassifier::new(TagKeyConstraints::default(), TagValuePolicy::default());
    let orphans: HashSet<String> = classifier
        .classify(&listings.snapshots, &listings.images, &graph)
        .into_iter()
        .map(|e| e.resource_id)
        .collect();

    assert!(lineage.is_disjoint(&orphans));
    let union: HashSet<String> = lineage.union(&orphans).cloned().collect();
    let all: HashSet<String> = listings.snapshots.iter().map(|s| s.id.clone()).collect();
    assert_eq!(union, all);
}

#[test]
fn image_lineage_plans_backing_snapshots_once() {
    let listings = ComputeListings {
        instances: vec![instance("i-1", Some("web-01"), InstanceState::Running)],
        volumes: Vec::new(),
        snapshots: vec![snapshot(
            "snap-ami",
            None,
            Some("Created by CreateImage(i-1)"),
        )],
        images: vec![ImageListing {
            id: "ami-1".to_string(),
            source_instance_id: Some("i-1".to_string()),
            backing_snapshot_ids: vec!["snap-ami".to_string()],
            name: Some("web-01-golden".to_string()),
            description: None,
            existing_tags: TagMap::new(),
        }],
    };

    let entries = plan_all(&listings);
    let snap_entries: Vec<_> = entries
        .iter()
        .filter(|e| e.resource_id == "snap-ami")
        .collect();
    assert_eq!(snap_entries.len(), 1);
    assert_eq!(snap_entries[0].key.as_ref().unwrap().as_str(), "web-01");
}

#[test]
fn storage_forest_plans_like_compute() {
    let listings = StorageListings {
        entries: vec![
            StorageListing {
                id: "fs-1".to_string(),
                kind: tp_core::ResourceKind::FileSystem,
                name: Some("shared data".to_string()),
                parent_id: None,
                existing_tags: TagMap::new(),
            },
            StorageListing {
                id: "fsap-1".to_string(),
                kind: tp_core::ResourceKind::AccessPoint,
                name: None,
                parent_id: Some("fs-1".to_string()),
                existing_tags: TagMap::new(),
            },
        ],
    };

    let graph = StorageGraph::build(&listings);
    let entries: Vec<_> = plan(
        &graph.forest,
        &TagKeyConstraints::default(),
        TagValuePolicy::default(),
    )
    .collect();

    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e.key.as_ref().unwrap().as_str() == "shared-data" && e.is_write()));
}
