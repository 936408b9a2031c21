//! JSON documents exchanged with the story backend.
//!
//! The backend stores whole stories as one document. Node narration lives in
//! the node's generated script; timestamps may be emitted without an offset,
//! in which case they are UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use reelbranch_core::gateway::{BranchCreated, FetchedTree, FlatNode, StorySummary};
use reelbranch_core::genre::Genre;
use reelbranch_core::time::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Body of `POST /stories`.
#[derive(Debug, Serialize)]
pub struct CreateStoryBody<'a> {
    /// Requested genre.
    pub genre: Genre,
    /// Narration language.
    pub language_code: &'a str,
}

/// Body of `POST /stories/{id}/branches`. The backend rejects unknown
/// fields here; branches inherit the story's narration language.
#[derive(Debug, Serialize)]
pub struct CreateBranchBody<'a> {
    /// Node the decision was made on.
    pub parent_node_id: Uuid,
    /// Decision text.
    pub decision: &'a str,
}

/// One narrated frame of a node's script.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameDocument {
    /// Spoken text; the first frame's narration is the node's content.
    #[serde(default)]
    pub narration: String,
}

/// Script the backend generated for a node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptDocument {
    /// Frames in playback order.
    #[serde(default)]
    pub frames: Vec<FrameDocument>,
    /// Decisions the script suggests at the end of the node.
    #[serde(default)]
    pub decisions: Vec<String>,
}

/// A node as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDocument {
    /// Node identifier.
    pub id: Uuid,
    /// Parent node, absent for the root.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Child ids, new branches appended last.
    #[serde(default)]
    pub children: Vec<Uuid>,
    /// Decision that led here; empty or absent for the root.
    #[serde(default)]
    pub decision: Option<String>,
    /// Rendered video, once available.
    #[serde(default)]
    pub video_url: Option<String>,
    /// Rendered thumbnail, once available.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Generated script.
    #[serde(default)]
    pub script: Option<ScriptDocument>,
    /// Creation instant, UTC.
    #[serde(deserialize_with = "lenient_utc")]
    pub created_at: Timestamp,
}

/// A whole story as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryDocument {
    /// Story identifier.
    pub id: Uuid,
    /// Generated title.
    pub title: String,
    /// Requested genre.
    pub genre: Genre,
    /// Root node of the tree.
    pub root_node_id: Uuid,
    /// Every node of the story, in storage order.
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    /// Creation instant, UTC.
    #[serde(default, deserialize_with = "lenient_utc_opt")]
    pub created_at: Option<Timestamp>,
    /// Last modification instant, UTC; used as the last-played time.
    #[serde(default, deserialize_with = "lenient_utc_opt")]
    pub updated_at: Option<Timestamp>,
}

fn parse_utc(raw: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_utc<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn lenient_utc_opt<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_utc(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

impl From<NodeDocument> for FlatNode {
    fn from(doc: NodeDocument) -> Self {
        let script = doc.script.unwrap_or_default();
        Self {
            id: doc.id,
            parent_id: doc.parent_id,
            children: doc.children,
            content: script
                .frames
                .into_iter()
                .next()
                .map(|f| f.narration)
                .unwrap_or_default(),
            video_ref: doc.video_url,
            thumbnail_ref: doc.thumbnail_url,
            decision: doc.decision.filter(|d| !d.is_empty()),
            suggested_decisions: script.decisions,
            created_at: doc.created_at,
        }
    }
}

impl StoryDocument {
    /// Summary used by story lists.
    #[must_use]
    pub fn summary(&self) -> StorySummary {
        StorySummary {
            story_id: self.id,
            title: self.title.clone(),
            genre: self.genre,
            root_node_id: self.root_node_id,
            last_played_at: self.updated_at.or(self.created_at).unwrap_or_default(),
        }
    }

    /// Flat node list for tree construction.
    #[must_use]
    pub fn into_tree(self) -> FetchedTree {
        FetchedTree {
            root_node_id: self.root_node_id,
            nodes: self.nodes.into_iter().map(FlatNode::from).collect(),
        }
    }

    /// Interprets this document as the answer to a branch request on
    /// `parent_node_id`. The backend appends new branches to the parent's
    /// `children`, so the new node is the last listed child present in the
    /// document. Without a listed child it is the most recently created node
    /// naming the parent, later entries winning timestamp ties. Returns
    /// `None` if the parent has no children in the document.
    #[must_use]
    pub fn into_branch(self, parent_node_id: Uuid) -> Option<BranchCreated> {
        let is_child = |id: Uuid| {
            self.nodes
                .iter()
                .any(|n| n.id == id && n.parent_id == Some(parent_node_id))
        };
        let listed = self
            .nodes
            .iter()
            .find(|n| n.id == parent_node_id)
            .and_then(|parent| parent.children.iter().rev().copied().find(|id| is_child(*id)));
        let new_node_id = match listed {
            Some(id) => id,
            None => {
                self.nodes
                    .iter()
                    .filter(|n| n.parent_id == Some(parent_node_id))
                    .fold(None, |newest: Option<&NodeDocument>, node| match newest {
                        Some(current) if current.created_at > node.created_at => Some(current),
                        _ => Some(node),
                    })?
                    .id
            }
        };
        Some(BranchCreated {
            new_node_id,
            nodes: self.nodes.into_iter().map(FlatNode::from).collect(),
        })
    }
}
