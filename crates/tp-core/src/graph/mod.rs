//! Ownership graphs for tag propagation.
//!
//! Both builders produce a forest of trees: one tree per propagation root,
//! each node carrying the tags already present on the resource. The
//! builders are pure transformations of already-fetched listings; any
//! inconsistency is collected as a non-fatal [`GraphIssue`].

pub mod compute;
pub mod storage;

pub use compute::ComputeGraph;
pub use storage::StorageGraph;

use crate::resource::{ResourceKind, TagMap};
use serde::Serialize;
use thiserror::Error;

/// A node in a propagation tree.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// Provider-assigned resource id.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Tags currently on the resource.
    pub existing_tags: TagMap,
    /// Resources whose tag derives from this one.
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: ResourceKind, existing_tags: TagMap) -> Self {
        Self {
            id: id.into(),
            kind,
            existing_tags,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, root included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// One propagation root and its derived resources.
#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    /// Display name of the root, the basis for the propagated tag key.
    pub source_name: Option<String>,
    pub root: Node,
}

/// An ordered forest of propagation trees for one region.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Forest {
    pub trees: Vec<Tree>,
}

impl Forest {
    /// Total number of resources across all trees.
    pub fn len(&self) -> usize {
        self.trees.iter().map(|t| t.root.subtree_len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Non-fatal problems found while building a graph.
///
/// Issues are reported alongside the graph; they never abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GraphIssue {
    /// A resource references a parent that is absent from the listings.
    /// The child is left out of the forest (compute-side children become
    /// orphan candidates instead).
    #[error("{subject_id} references missing parent {parent_id}")]
    Inconsistency {
        subject_id: String,
        parent_id: String,
    },
    /// A listing entry of an unrecognized sub-kind was ignored.
    #[error("unsupported resource kind '{kind}' for {subject_id}")]
    UnsupportedKind { subject_id: String, kind: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TagMap;

    #[test]
    fn test_subtree_len() {
        let mut root = Node::new("i-1", ResourceKind::Instance, TagMap::new());
        let mut vol = Node::new("vol-1", ResourceKind::Volume, TagMap::new());
        vol.children
            .push(Node::new("snap-1", ResourceKind::Snapshot, TagMap::new()));
        root.children.push(vol);
        assert_eq!(root.subtree_len(), 3);
    }

    #[test]
    fn test_forest_len() {
        let forest = Forest {
            trees: vec![Tree {
                source_name: Some("a".to_string()),
                root: Node::new("i-1", ResourceKind::Instance, TagMap::new()),
            }],
        };
        assert_eq!(forest.len(), 1);
        assert!(!forest.is_empty());
    }
}
