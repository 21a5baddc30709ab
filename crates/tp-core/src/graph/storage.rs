//! Storage-side ownership graph.
//!
//! Every file system (EFS or FSx) and every FSx file cache roots its own
//! tree; sub-resources attach by the parent id recorded in their listing.
//! Storage roots have no terminated state, so there is no orphan concept
//! here.

use crate::graph::{Forest, GraphIssue, Node, Tree};
use crate::resource::{StorageListing, StorageListings};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// The ownership forest for one region's storage-service resources.
#[derive(Debug, Clone)]
pub struct StorageGraph {
    pub forest: Forest,
    /// Non-fatal problems found while building.
    pub issues: Vec<GraphIssue>,
}

impl StorageGraph {
    /// Builds the forest from one region's storage listings.
    pub fn build(listings: &StorageListings) -> Self {
        let mut issues: Vec<GraphIssue> = Vec::new();

        let mut valid: Vec<&StorageListing> = Vec::new();
        for entry in &listings.entries {
            if entry.kind.is_storage() {
                valid.push(entry);
            } else {
                warn!(id = %entry.id, kind = %entry.kind, "ignoring non-storage kind in storage listings");
                issues.push(GraphIssue::UnsupportedKind {
                    subject_id: entry.id.clone(),
                    kind: entry.kind.to_string(),
                });
            }
        }

        let mut children_of: HashMap<&str, Vec<&StorageListing>> = HashMap::new();
        let mut roots: Vec<&StorageListing> = Vec::new();
        for entry in &valid {
            match entry.parent_id.as_deref() {
                None => roots.push(entry),
                Some(parent) => children_of.entry(parent).or_default().push(entry),
            }
        }

        let mut claimed: HashSet<String> = HashSet::new();
        let mut trees: Vec<Tree> = Vec::new();
        for root in roots {
            if !claimed.insert(root.id.clone()) {
                continue;
            }
            trees.push(Tree {
                source_name: root.name.clone(),
                root: attach(root, &children_of, &mut claimed),
            });
        }

        // Anything valid but unreachable has a broken parent chain.
        for entry in &valid {
            if !claimed.contains(&entry.id) {
                let parent = entry
                    .parent_id
                    .clone()
                    .unwrap_or_else(|| "<unspecified>".to_string());
                warn!(id = %entry.id, parent = %parent, "storage resource unreachable from any root");
                issues.push(GraphIssue::Inconsistency {
                    subject_id: entry.id.clone(),
                    parent_id: parent,
                });
            }
        }

        Self {
            forest: Forest { trees },
            issues,
        }
    }
}

fn attach(
    entry: &StorageListing,
    children_of: &HashMap<&str, Vec<&StorageListing>>,
    claimed: &mut HashSet<String>,
) -> Node {
    let mut node = Node::new(&entry.id, entry.kind, entry.existing_tags.clone());
    for child in children_of.get(entry.id.as_str()).into_iter().flatten() {
        if claimed.insert(child.id.clone()) {
            node.children.push(attach(child, children_of, claimed));
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceKind, TagMap};

    fn entry(
        id: &str,
        kind: ResourceKind,
        name: Option<&str>,
        parent: Option<&str>,
    ) -> StorageListing {
        StorageListing {
            id: id.to_string(),
            kind,
            name: name.map(String::from),
            parent_id: parent.map(String::from),
            existing_tags: TagMap::new(),
        }
    }

    #[test]
    fn test_filesystem_roots_with_children() {
        let listings = StorageListings {
            entries: vec![
                entry("fs-1", ResourceKind::FileSystem, Some("shared-efs"), None),
                entry("fsap-1", ResourceKind::AccessPoint, None, Some("fs-1")),
                entry("fsmt-1", ResourceKind::MountTarget, None, Some("fs-1")),
            ],
        };
        let graph = StorageGraph::build(&listings);

        assert_eq!(graph.forest.trees.len(), 1);
        let tree = &graph.forest.trees[0];
        assert_eq!(tree.source_name.as_deref(), Some("shared-efs"));
        assert_eq!(tree.root.children.len(), 2);
        assert!(graph.issues.is_empty());
    }

    #[test]
    fn test_nested_ontap_chain() {
        // ONTAP: filesystem → storage VM → volume, plus a backup of the
        // filesystem itself.
        let listings = StorageListings {
            entries: vec![
                entry("fs-on", ResourceKind::FileSystem, Some("ontap-prod"), None),
                entry("svm-1", ResourceKind::FsxStorageVm, None, Some("fs-on")),
                entry("fsvol-1", ResourceKind::FsxVolume, None, Some("svm-1")),
                entry("backup-1", ResourceKind::FsxBackup, None, Some("fs-on")),
            ],
        };
        let graph = StorageGraph::build(&listings);

        let root = &graph.forest.trees[0].root;
        assert_eq!(root.children.len(), 2);
        let svm = &root.children[0];
        assert_eq!(svm.id, "svm-1");
        assert_eq!(svm.children[0].id, "fsvol-1");
    }

    #[test]
    fn test_file_cache_is_a_root() {
        let listings = StorageListings {
            entries: vec![entry(
                "fc-1",
                ResourceKind::FsxFileCache,
                Some("scratch-cache"),
                None,
            )],
        };
        let graph = StorageGraph::build(&listings);
        assert_eq!(graph.forest.trees.len(), 1);
    }

    #[test]
    fn test_missing_parent_is_reported_not_fatal() {
        let listings = StorageListings {
            entries: vec![
                entry("fs-1", ResourceKind::FileSystem, Some("efs"), None),
                entry("fsvol-x", ResourceKind::FsxVolume, None, Some("fs-gone")),
            ],
        };
        let graph = StorageGraph::build(&listings);

        assert_eq!(graph.forest.trees.len(), 1);
        assert_eq!(
            graph.issues,
            vec![GraphIssue::Inconsistency {
                subject_id: "fsvol-x".to_string(),
                parent_id: "fs-gone".to_string(),
            }]
        );
    }

    #[test]
    fn test_non_storage_kind_ignored_and_reported() {
        let listings = StorageListings {
            entries: vec![entry("i-1", ResourceKind::Instance, None, None)],
        };
        let graph = StorageGraph::build(&listings);

        assert!(graph.forest.trees.is_empty());
        assert_eq!(
            graph.issues,
            vec![GraphIssue::UnsupportedKind {
                subject_id: "i-1".to_string(),
                kind: "Instance".to_string(),
            }]
        );
    }
}
