//! Narrative beats and the id index over them.

use std::collections::HashMap;

use reelbranch_core::gateway::FlatNode;
use reelbranch_core::time::Timestamp;
use serde::Serialize;
use uuid::Uuid;

/// One narrative beat: a video segment plus its outgoing decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Node identifier, stable across reloads.
    pub id: Uuid,
    /// Narration shown alongside the segment.
    pub content: String,
    /// Reference to the video segment, if rendered.
    pub video_ref: Option<String>,
    /// Reference to a still for list views.
    pub thumbnail_ref: Option<String>,
    /// The choice that led into this node. Absent for the root.
    pub decision: Option<String>,
    /// Owning node. Absent for the root.
    pub parent_id: Option<Uuid>,
    /// Resolved child ids in presentation order.
    pub children: Vec<Uuid>,
    /// Continuations the generator proposed for this node.
    pub suggested_decisions: Vec<String>,
    /// When the backend generated this node.
    pub created_at: Timestamp,
}

impl NodeRecord {
    /// Creates a record from a backend node with the given resolved parent
    /// and no children yet.
    #[must_use]
    pub(crate) fn resolved(node: &FlatNode, parent_id: Option<Uuid>) -> Self {
        Self {
            id: node.id,
            content: node.content.clone(),
            video_ref: node.video_ref.clone(),
            thumbnail_ref: node.thumbnail_ref.clone(),
            decision: node.decision.clone(),
            parent_id,
            children: Vec::new(),
            suggested_decisions: node.suggested_decisions.clone(),
            created_at: node.created_at,
        }
    }

    /// Returns the backend shape of this record.
    #[must_use]
    pub fn to_flat(&self) -> FlatNode {
        FlatNode {
            id: self.id,
            parent_id: self.parent_id,
            children: self.children.clone(),
            content: self.content.clone(),
            video_ref: self.video_ref.clone(),
            thumbnail_ref: self.thumbnail_ref.clone(),
            decision: self.decision.clone(),
            suggested_decisions: self.suggested_decisions.clone(),
            created_at: self.created_at,
        }
    }

    /// Whether the story has not been extended past this node yet.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Id to node lookup table for one story.
pub type NodeIndex = HashMap<Uuid, NodeRecord>;
