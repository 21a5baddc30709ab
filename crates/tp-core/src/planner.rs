//! Propagation planner.
//!
//! Walks a forest and emits, for every node, the tag it should carry and
//! whether a write is needed. The planner never mutates its inputs and is
//! agnostic to dry-run versus apply; the caller decides what to do with
//! WRITE entries.

use crate::graph::{Forest, Node, Tree};
use crate::normalize::{normalize, TagKey, TagKeyConstraints};
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};

/// Decision for a single resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// The computed tag is absent; one write call is required.
    Write,
    /// A tag with the computed key already exists (any value); never
    /// overwritten.
    SkipAlreadyTagged,
    /// The root's name did not normalize; nothing to propagate.
    SkipNoSourceName,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanAction::Write => "WRITE",
            PlanAction::SkipAlreadyTagged => "SKIP (already tagged)",
            PlanAction::SkipNoSourceName => "SKIP (no source name)",
        };
        write!(f, "{}", s)
    }
}

/// What value accompanies a propagated tag key.
///
/// The empty-value convention (the key itself carries the identity) is a
/// deliberate policy to maximize compatibility with grouping tools; it is
/// named here rather than inlined so the planner's control flow survives
/// future alternate policies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagValuePolicy {
    /// Key carries the identity; value is always blank.
    #[default]
    EmptyValue,
}

impl TagValuePolicy {
    /// The value to write alongside the given key.
    pub fn value_for(&self, _key: &TagKey) -> String {
        match self {
            TagValuePolicy::EmptyValue => String::new(),
        }
    }
}

/// One planned tag operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagPlanEntry {
    pub resource_id: String,
    pub kind: ResourceKind,
    /// Absent only for `SkipNoSourceName` entries.
    pub key: Option<TagKey>,
    pub value: String,
    pub action: PlanAction,
}

impl TagPlanEntry {
    pub fn write(node: &Node, key: TagKey, value: String) -> Self {
        Self {
            resource_id: node.id.clone(),
            kind: node.kind,
            key: Some(key),
            value,
            action: PlanAction::Write,
        }
    }

    pub fn skip_already_tagged(node: &Node, key: TagKey) -> Self {
        Self {
            resource_id: node.id.clone(),
            kind: node.kind,
            key: Some(key),
            value: String::new(),
            action: PlanAction::SkipAlreadyTagged,
        }
    }

    pub fn skip_no_source_name(node: &Node) -> Self {
        Self {
            resource_id: node.id.clone(),
            kind: node.kind,
            key: None,
            value: String::new(),
            action: PlanAction::SkipNoSourceName,
        }
    }

    pub fn is_write(&self) -> bool {
        self.action == PlanAction::Write
    }
}

/// Plans tag propagation over a forest.
///
/// Returns a lazy, finite iterator; calling `plan` again on the same
/// forest re-derives the identical sequence. Nodes are visited parent
/// before child (pre-order), so a child is never planned before the
/// identity it inherits is resolved.
pub fn plan<'f>(
    forest: &'f Forest,
    constraints: &TagKeyConstraints,
    policy: TagValuePolicy,
) -> PlanIter<'f> {
    PlanIter {
        constraints: constraints.clone(),
        policy,
        trees: forest.trees.iter(),
        current_key: None,
        stack: Vec::new(),
    }
}

/// Lazy pre-order walk over a forest, yielding one entry per node.
pub struct PlanIter<'f> {
    constraints: TagKeyConstraints,
    policy: TagValuePolicy,
    trees: std::slice::Iter<'f, Tree>,
    /// Key for the tree currently being walked; `None` means the root's
    /// name failed normalization and the subtree is skipped.
    current_key: Option<TagKey>,
    stack: Vec<&'f Node>,
}

impl<'f> Iterator for PlanIter<'f> {
    type Item = TagPlanEntry;

    fn next(&mut self) -> Option<TagPlanEntry> {
        loop {
            if let Some(node) = self.stack.pop() {
                for child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some(match &self.current_key {
                    None => TagPlanEntry::skip_no_source_name(node),
                    Some(key) => {
                        if node.existing_tags.contains_key(key.as_str()) {
                            TagPlanEntry::skip_already_tagged(node, key.clone())
                        } else {
                            let value = self.policy.value_for(key);
                            TagPlanEntry::write(node, key.clone(), value)
                        }
                    }
                });
            }

            let tree = self.trees.next()?;
            self.current_key = tree
                .source_name
                .as_deref()
                .and_then(|name| normalize(name, &self.constraints).ok());
            self.stack.push(&tree.root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Forest, Node, Tree};
    use crate::resource::TagMap;

    fn leaf(id: &str, kind: ResourceKind, tags: TagMap) -> Node {
        Node::new(id, kind, tags)
    }

    fn forest_of(trees: Vec<Tree>) -> Forest {
        Forest { trees }
    }

    #[test]
    fn test_preorder_write_plan() {
        let mut root = leaf("i-1", ResourceKind::Instance, TagMap::new());
        root.children
            .push(leaf("vol-1", ResourceKind::Volume, TagMap::new()));
        let forest = forest_of(vec![Tree {
            source_name: Some("web-01".to_string()),
            root,
        }]);

        let entries: Vec<_> =
            plan(&forest, &TagKeyConstraints::default(), TagValuePolicy::default()).collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].resource_id, "i-1");
        assert_eq!(entries[0].key.as_ref().unwrap().as_str(), "web-01");
        assert_eq!(entries[0].value, "");
        assert!(entries[0].is_write());
        assert_eq!(entries[1].resource_id, "vol-1");
        assert!(entries[1].is_write());
    }

    #[test]
    fn test_existing_key_never_overwritten() {
        let mut tags = TagMap::new();
        tags.insert("legacy-app".to_string(), "v".to_string());
        let forest = forest_of(vec![Tree {
            source_name: Some("legacy-app".to_string()),
            root: leaf("vol-4", ResourceKind::Volume, tags),
        }]);

        let entries: Vec<_> =
            plan(&forest, &TagKeyConstraints::default(), TagValuePolicy::default()).collect();
        assert_eq!(entries[0].action, PlanAction::SkipAlreadyTagged);
    }

    #[test]
    fn test_nameless_root_skips_whole_subtree() {
        let mut root = leaf("i-3", ResourceKind::Instance, TagMap::new());
        root.children
            .push(leaf("vol-3", ResourceKind::Volume, TagMap::new()));
        let forest = forest_of(vec![Tree {
            source_name: Some("   ".to_string()),
            root,
        }]);

        let entries: Vec<_> =
            plan(&forest, &TagKeyConstraints::default(), TagValuePolicy::default()).collect();

        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.action == PlanAction::SkipNoSourceName && e.key.is_none()));
    }

    #[test]
    fn test_failed_root_does_not_abort_later_trees() {
        let forest = forest_of(vec![
            Tree {
                source_name: None,
                root: leaf("i-x", ResourceKind::Instance, TagMap::new()),
            },
            Tree {
                source_name: Some("ok".to_string()),
                root: leaf("i-y", ResourceKind::Instance, TagMap::new()),
            },
        ]);

        let entries: Vec<_> =
            plan(&forest, &TagKeyConstraints::default(), TagValuePolicy::default()).collect();
        assert_eq!(entries[0].action, PlanAction::SkipNoSourceName);
        assert!(entries[1].is_write());
    }

    #[test]
    fn test_plan_is_restartable_and_deterministic() {
        let mut root = leaf("i-1", ResourceKind::Instance, TagMap::new());
        root.children
            .push(leaf("vol-a", ResourceKind::Volume, TagMap::new()));
        root.children
            .push(leaf("vol-b", ResourceKind::Volume, TagMap::new()));
        let forest = forest_of(vec![Tree {
            source_name: Some("app".to_string()),
            root,
        }]);
        let constraints = TagKeyConstraints::default();

        let first: Vec<_> = plan(&forest, &constraints, TagValuePolicy::default()).collect();
        let second: Vec<_> = plan(&forest, &constraints, TagValuePolicy::default()).collect();
        assert_eq!(first, second);
    }
}
