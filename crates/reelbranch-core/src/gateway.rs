//! Story-generation backend abstraction.
//!
//! The narrative engine only depends on this contract. Transport, retries
//! and timeouts belong to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NarrativeError;
use crate::genre::Genre;
use crate::time::Timestamp;

/// A node as the backend returns it: references are ids, never nested nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    /// Node identifier.
    pub id: Uuid,
    /// Owning node, absent for the root.
    pub parent_id: Option<Uuid>,
    /// Child ids in decision presentation order.
    pub children: Vec<Uuid>,
    /// Narration for this beat.
    pub content: String,
    /// Opaque reference to the video segment, if one has been rendered.
    pub video_ref: Option<String>,
    /// Opaque reference to a still used by list views.
    #[serde(default)]
    pub thumbnail_ref: Option<String>,
    /// The choice that led into this node.
    pub decision: Option<String>,
    /// Choices the generator proposed for continuing from this node.
    #[serde(default)]
    pub suggested_decisions: Vec<String>,
    /// When the backend generated this node.
    pub created_at: Timestamp,
}

/// Result of a tree fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedTree {
    /// The designated root.
    pub root_node_id: Uuid,
    /// Every node of the story, in backend order.
    pub nodes: Vec<FlatNode>,
}

/// Result of a branch creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCreated {
    /// The newly generated node.
    pub new_node_id: Uuid,
    /// At least the new node plus the ancestors and siblings needed to keep
    /// the index consistent.
    pub nodes: Vec<FlatNode>,
}

/// A story as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    /// Story identifier.
    pub story_id: Uuid,
    /// Display title.
    pub title: String,
    /// Genre the story was generated in.
    pub genre: Genre,
    /// Root node of the story tree.
    pub root_node_id: Uuid,
    /// Last time the story was played or extended.
    pub last_played_at: Timestamp,
}

/// Contract the narrative engine requires from the story backend.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Generate a new story in the given genre.
    async fn create_story(&self, genre: Genre) -> Result<StorySummary, NarrativeError>;

    /// Fetch the full flat node list of a story.
    async fn fetch_tree(&self, story_id: Uuid) -> Result<FetchedTree, NarrativeError>;

    /// Generate a new branch below `parent_node_id` for the given decision.
    async fn create_branch(
        &self,
        story_id: Uuid,
        parent_node_id: Uuid,
        decision: &str,
    ) -> Result<BranchCreated, NarrativeError>;

    /// List every story the backend knows about.
    async fn list_stories(&self) -> Result<Vec<StorySummary>, NarrativeError>;

    /// Resolve a playable video reference for a node.
    async fn resolve_video(&self, story_id: Uuid, node_id: Uuid)
    -> Result<String, NarrativeError>;

    /// Delete a story and all of its nodes.
    async fn delete_story(&self, story_id: Uuid) -> Result<(), NarrativeError>;
}
