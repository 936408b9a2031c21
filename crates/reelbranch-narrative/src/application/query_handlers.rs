//! Query handlers for the narrative session.
//!
//! These build read-only view DTOs out of a [`NarrativeStore`] for the
//! presentation layer.

use reelbranch_core::error::NarrativeError;
use serde::Serialize;
use uuid::Uuid;

use super::catalog::StoryListing;
use super::store::NarrativeStore;
use crate::domain::node::NodeRecord;
use crate::domain::prompt::PromptPhase;
use crate::domain::story::Story;
use crate::domain::tree::{StoryTree, TreeNode};

/// Error as shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    /// Machine-readable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl From<&NarrativeError> for ErrorView {
    fn from(error: &NarrativeError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// One entry of the story map: the node's label plus its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeOverviewNode {
    /// Node identifier, a valid navigation target.
    pub id: Uuid,
    /// The decision that led here, absent for the root.
    pub decision: Option<String>,
    /// Whether this is the active node.
    pub is_current: bool,
    /// Child entries in presentation order.
    pub children: Vec<TreeOverviewNode>,
}

/// Everything the presentation layer reads from a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    /// Loaded story, or the creation placeholder.
    pub story: Option<Story>,
    /// Active node.
    pub current_node: Option<NodeRecord>,
    /// Story map for the tree overview.
    pub tree: Option<TreeOverviewNode>,
    /// Number of nodes in the index.
    pub node_count: usize,
    /// Whether playback should be running.
    pub is_playing: bool,
    /// Playback volume.
    pub volume: f64,
    /// Whether the decision prompt is visible.
    pub show_decision_prompt: bool,
    /// Prompt lifecycle phase.
    pub prompt_phase: PromptPhase,
    /// Last reported position, in seconds.
    pub playback_position: f64,
    /// Last reported duration, in seconds.
    pub playback_duration: f64,
    /// Whether a create, load or decision call is in flight.
    pub is_loading: bool,
    /// Whether a story list refresh is in flight.
    pub is_refreshing: bool,
    /// Most recent failure.
    pub last_error: Option<ErrorView>,
}

/// Builds the presentation view of the session.
#[must_use]
pub fn session_view(store: &NarrativeStore) -> SessionView {
    let current_id = store.current_node().map(|n| n.id);
    let tree = store
        .tree()
        .map(|tree| overview(tree.root(), tree, current_id));

    SessionView {
        story: store.current_story().cloned(),
        current_node: store.current_node().cloned(),
        tree,
        node_count: store.nodes_by_id().map_or(0, std::collections::HashMap::len),
        is_playing: store.is_playing(),
        volume: store.volume(),
        show_decision_prompt: store.show_decision_prompt(),
        prompt_phase: store.prompt_phase(),
        playback_position: store.playback_position(),
        playback_duration: store.playback_duration(),
        is_loading: store.is_loading(),
        is_refreshing: store.is_refreshing(),
        last_error: store.last_error().map(ErrorView::from),
    }
}

fn overview(node: &TreeNode, tree: &StoryTree, current: Option<Uuid>) -> TreeOverviewNode {
    TreeOverviewNode {
        id: node.id,
        decision: tree.get(node.id).and_then(|n| n.decision.clone()),
        is_current: current == Some(node.id),
        children: node
            .children
            .iter()
            .map(|child| overview(child, tree, current))
            .collect(),
    }
}

/// Known stories, most recently played first.
#[must_use]
pub fn story_list(store: &NarrativeStore) -> Vec<StoryListing> {
    let mut listings = store.stories().to_vec();
    listings.sort_by(|a, b| b.summary.last_played_at.cmp(&a.summary.last_played_at));
    listings
}
