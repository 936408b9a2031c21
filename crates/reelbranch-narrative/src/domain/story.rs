//! Stories and the current-node pointer.

use reelbranch_core::gateway::StorySummary;
use reelbranch_core::genre::Genre;
use reelbranch_core::time::Timestamp;
use serde::Serialize;
use uuid::Uuid;

/// Title shown while a new story is being generated.
pub const PLACEHOLDER_TITLE: &str = "Creating your story...";

/// Which node of a story is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum NodePointer {
    /// The story is still being generated.
    Pending,
    /// A node present in the story's index.
    Node(Uuid),
}

impl NodePointer {
    /// The node id, unless pending.
    #[must_use]
    pub fn node_id(self) -> Option<Uuid> {
        match self {
            Self::Pending => None,
            Self::Node(id) => Some(id),
        }
    }
}

/// A story as held by the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    /// Story identifier. Nil while pending.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Genre the story was generated in.
    pub genre: Genre,
    /// Root node, unknown while pending.
    pub root_node_id: Option<Uuid>,
    /// Active node.
    pub current_node: NodePointer,
    /// Last time the story was opened.
    pub last_played_at: Timestamp,
}

impl Story {
    /// Placeholder exposed while the backend generates a new story.
    #[must_use]
    pub fn placeholder(genre: Genre, now: Timestamp) -> Self {
        Self {
            id: Uuid::nil(),
            title: PLACEHOLDER_TITLE.to_owned(),
            genre,
            root_node_id: None,
            current_node: NodePointer::Pending,
            last_played_at: now,
        }
    }

    /// Session story for a backend summary, positioned on `current`.
    #[must_use]
    pub fn opened(summary: &StorySummary, current: Uuid, now: Timestamp) -> Self {
        Self {
            id: summary.story_id,
            title: summary.title.clone(),
            genre: summary.genre,
            root_node_id: Some(summary.root_node_id),
            current_node: NodePointer::Node(current),
            last_played_at: now,
        }
    }

    /// Whether this is the creation placeholder.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.current_node == NodePointer::Pending
    }
}
