//! Narrative error taxonomy.

use thiserror::Error;
use uuid::Uuid;

/// Every failure the narrative engine can surface.
///
/// All variants are recoverable at the session level: the store records the
/// error as the session's last error and keeps its prior state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    /// The backend could not be reached or returned an unusable response.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A fetched tree does not contain its designated root node.
    #[error("malformed tree: root node {root_id} missing from story {story_id}")]
    MalformedTree {
        /// The story whose tree was fetched.
        story_id: Uuid,
        /// The root id the backend designated.
        root_id: Uuid,
    },

    /// The referenced story is not known to the session.
    #[error("story not found: {0}")]
    StoryNotFound(Uuid),

    /// The referenced node is not present in the loaded index.
    #[error("node not found: {0}")]
    NodeNotFound(Uuid),

    /// The operation requires a loaded story.
    #[error("no active story")]
    NoActiveStory,
}

impl NarrativeError {
    /// Machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::MalformedTree { .. } => "malformed_tree",
            Self::StoryNotFound(_) => "story_not_found",
            Self::NodeNotFound(_) => "node_not_found",
            Self::NoActiveStory => "no_active_story",
        }
    }
}
