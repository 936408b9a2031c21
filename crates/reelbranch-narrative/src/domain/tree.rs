//! Tree construction from flat backend node lists.
//!
//! The backend hands out nodes that reference each other by id only.
//! [`build_tree`] resolves those references into a rooted tree plus an id
//! index over the same node set. It never touches caller state: the caller
//! receives a finished [`StoryTree`] and swaps it in as a whole.

use std::collections::HashMap;

use reelbranch_core::error::NarrativeError;
use reelbranch_core::gateway::FlatNode;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::node::{NodeIndex, NodeRecord};

/// Structural view of the tree: ids only, children in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Node identifier, resolvable through the owning tree's index.
    pub id: Uuid,
    /// Child subtrees.
    pub children: Vec<TreeNode>,
}

/// A fully linked story tree and its id index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryTree {
    root: TreeNode,
    index: NodeIndex,
}

/// Builds a tree rooted at `root_id` out of a flat node list.
///
/// Child ids that cannot be resolved, that repeat under one parent, that
/// point back into already visited nodes, or whose node claims a different
/// parent are dropped from the listing parent. Nodes not reachable from the
/// root are left out of the index.
///
/// # Errors
///
/// Returns `NarrativeError::MalformedTree` if `root_id` is not in `nodes`.
pub fn build_tree(
    story_id: Uuid,
    root_id: Uuid,
    nodes: &[FlatNode],
) -> Result<StoryTree, NarrativeError> {
    let mut by_id: HashMap<Uuid, &FlatNode> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        by_id.entry(node.id).or_insert(node);
    }

    let Some(root) = by_id.get(&root_id) else {
        return Err(NarrativeError::MalformedTree { story_id, root_id });
    };

    let mut index = NodeIndex::with_capacity(by_id.len());
    let root = resolve(root, None, &by_id, &mut index);

    let dropped = by_id.len() - index.len();
    if dropped > 0 {
        debug!(%story_id, dropped, "nodes unreachable from root left out of index");
    }

    Ok(StoryTree { root, index })
}

fn resolve(
    node: &FlatNode,
    parent_id: Option<Uuid>,
    by_id: &HashMap<Uuid, &FlatNode>,
    index: &mut NodeIndex,
) -> TreeNode {
    // Inserting before descending marks the node visited, so cycles and
    // repeated ids terminate.
    index.insert(node.id, NodeRecord::resolved(node, parent_id));

    let mut subtrees = Vec::with_capacity(node.children.len());
    let mut child_ids = Vec::with_capacity(node.children.len());
    for child_id in &node.children {
        if index.contains_key(child_id) {
            debug!(parent = %node.id, child = %child_id, "skipping revisited child");
            continue;
        }
        let Some(child) = by_id.get(child_id) else {
            debug!(parent = %node.id, child = %child_id, "dropping dangling child reference");
            continue;
        };
        if child.parent_id.is_some_and(|claimed| claimed != node.id) {
            debug!(parent = %node.id, child = %child_id, "child claims another parent");
            continue;
        }
        subtrees.push(resolve(child, Some(node.id), by_id, index));
        child_ids.push(*child_id);
    }

    if let Some(record) = index.get_mut(&node.id) {
        record.children = child_ids;
    }

    TreeNode {
        id: node.id,
        children: subtrees,
    }
}

impl StoryTree {
    /// Returns the root identifier.
    #[must_use]
    pub fn root_id(&self) -> Uuid {
        self.root.id
    }

    /// Returns the structural root of the tree.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Returns the id index.
    #[must_use]
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&NodeRecord> {
        self.index.get(&id)
    }

    /// Whether the node is part of this tree.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Always false: a built tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates the records in pre-order, children in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> + '_ {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                stack.extend(node.children.iter().rev());
                if let Some(record) = self.index.get(&node.id) {
                    return Some(record);
                }
            }
            None
        })
    }

    /// The most recently created node anywhere in the tree. Ties go to the
    /// node met first in pre-order.
    #[must_use]
    pub fn latest_node(&self) -> Option<&NodeRecord> {
        self.iter().fold(None, |latest: Option<&NodeRecord>, record| match latest {
            Some(current) if current.created_at >= record.created_at => Some(current),
            _ => Some(record),
        })
    }

    /// Still reference for list views: the root's thumbnail, else its video.
    #[must_use]
    pub fn thumbnail_ref(&self) -> Option<&str> {
        let root = self.index.get(&self.root.id)?;
        root.thumbnail_ref.as_deref().or(root.video_ref.as_deref())
    }

    /// Serializes the tree back into a flat, pre-order node list.
    #[must_use]
    pub fn flatten(&self) -> Vec<FlatNode> {
        self.iter().map(NodeRecord::to_flat).collect()
    }

    /// Produces a new tree with `incoming` nodes merged in.
    ///
    /// Unknown ids are added. Known ids are replaced by the incoming record,
    /// keeping any existing children the replacement does not list. New nodes
    /// are appended to their parent's children when the parent does not list
    /// them yet.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::MalformedTree` only if the merge would lose
    /// the root, which cannot happen for a tree built by [`build_tree`].
    pub fn merge(&self, story_id: Uuid, incoming: &[FlatNode]) -> Result<Self, NarrativeError> {
        let mut merged = self.flatten();
        let mut position: HashMap<Uuid, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();

        for node in incoming {
            if let Some(&i) = position.get(&node.id) {
                let mut replacement = node.clone();
                for child in &merged[i].children {
                    if !replacement.children.contains(child) {
                        replacement.children.push(*child);
                    }
                }
                merged[i] = replacement;
            } else {
                position.insert(node.id, merged.len());
                merged.push(node.clone());
            }
        }

        for node in incoming {
            let Some(parent_id) = node.parent_id else {
                continue;
            };
            if let Some(&i) = position.get(&parent_id) {
                if !merged[i].children.contains(&node.id) {
                    merged[i].children.push(node.id);
                }
            }
        }

        build_tree(story_id, self.root_id(), &merged)
    }
}
