//! `BackendGateway` implementations for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use reelbranch_core::error::NarrativeError;
use reelbranch_core::gateway::{
    BackendGateway, BranchCreated, FetchedTree, FlatNode, StorySummary,
};
use reelbranch_core::genre::Genre;
use uuid::Uuid;

use crate::fixtures::minute;

/// A call received by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateStory(Genre),
    FetchTree(Uuid),
    CreateBranch {
        story_id: Uuid,
        parent_node_id: Uuid,
        decision: String,
    },
    ListStories,
    ResolveVideo {
        story_id: Uuid,
        node_id: Uuid,
    },
    DeleteStory(Uuid),
}

#[derive(Debug, Default)]
struct Backend {
    stories: Vec<(StorySummary, FetchedTree)>,
    failing_fetches: HashSet<Uuid>,
    calls: Vec<GatewayCall>,
    tick: i64,
}

impl Backend {
    fn next_instant(&mut self) -> reelbranch_core::time::Timestamp {
        self.tick += 1;
        minute(1_000 + self.tick)
    }

    fn story_mut(&mut self, story_id: Uuid) -> Option<&mut (StorySummary, FetchedTree)> {
        self.stories.iter_mut().find(|(s, _)| s.story_id == story_id)
    }
}

/// An in-memory story backend that records every call. Stories can be
/// seeded with [`InMemoryGateway::insert_story`]; created stories and
/// branches are generated with ids from `Uuid::new_v4` and strictly
/// increasing timestamps.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    backend: Mutex<Backend>,
}

impl InMemoryGateway {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a story. The summary's root id is taken from the tree.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_story(&self, title: &str, genre: Genre, tree: FetchedTree) -> StorySummary {
        let summary = StorySummary {
            story_id: Uuid::new_v4(),
            title: title.to_owned(),
            genre,
            root_node_id: tree.root_node_id,
            last_played_at: minute(0),
        };
        self.backend
            .lock()
            .unwrap()
            .stories
            .push((summary.clone(), tree));
        summary
    }

    /// Makes every subsequent `fetch_tree` for `story_id` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_fetches_for(&self, story_id: Uuid) {
        self.backend
            .lock()
            .unwrap()
            .failing_fetches
            .insert(story_id);
    }

    /// Returns a snapshot of all calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.backend.lock().unwrap().calls.clone()
    }

    /// Returns the backend's current tree for a story.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn tree_of(&self, story_id: Uuid) -> Option<FetchedTree> {
        self.backend
            .lock()
            .unwrap()
            .stories
            .iter()
            .find(|(s, _)| s.story_id == story_id)
            .map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl BackendGateway for InMemoryGateway {
    async fn create_story(&self, genre: Genre) -> Result<StorySummary, NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(GatewayCall::CreateStory(genre));

        let created_at = backend.next_instant();
        let root_id = Uuid::new_v4();
        let root = FlatNode {
            id: root_id,
            parent_id: None,
            children: Vec::new(),
            content: format!("a {genre} opening"),
            video_ref: Some(format!("memory://{root_id}.mp4")),
            thumbnail_ref: Some(format!("memory://{root_id}.png")),
            decision: None,
            suggested_decisions: vec!["look around".to_owned(), "run".to_owned()],
            created_at,
        };
        let summary = StorySummary {
            story_id: Uuid::new_v4(),
            title: format!("A {genre} story"),
            genre,
            root_node_id: root_id,
            last_played_at: created_at,
        };
        backend.stories.push((
            summary.clone(),
            FetchedTree {
                root_node_id: root_id,
                nodes: vec![root],
            },
        ));
        Ok(summary)
    }

    async fn fetch_tree(&self, story_id: Uuid) -> Result<FetchedTree, NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(GatewayCall::FetchTree(story_id));
        if backend.failing_fetches.contains(&story_id) {
            return Err(NarrativeError::BackendUnavailable("connection refused".into()));
        }
        backend
            .story_mut(story_id)
            .map(|(_, tree)| tree.clone())
            .ok_or(NarrativeError::StoryNotFound(story_id))
    }

    async fn create_branch(
        &self,
        story_id: Uuid,
        parent_node_id: Uuid,
        decision: &str,
    ) -> Result<BranchCreated, NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(GatewayCall::CreateBranch {
            story_id,
            parent_node_id,
            decision: decision.to_owned(),
        });
        let created_at = backend.next_instant();

        let (_, tree) = backend
            .story_mut(story_id)
            .ok_or(NarrativeError::StoryNotFound(story_id))?;
        let Some(parent) = tree.nodes.iter_mut().find(|n| n.id == parent_node_id) else {
            return Err(NarrativeError::NodeNotFound(parent_node_id));
        };

        let new_id = Uuid::new_v4();
        parent.children.push(new_id);
        let parent = parent.clone();
        let node = FlatNode {
            id: new_id,
            parent_id: Some(parent_node_id),
            children: Vec::new(),
            content: format!("after {decision}"),
            video_ref: Some(format!("memory://{new_id}.mp4")),
            thumbnail_ref: None,
            decision: Some(decision.to_owned()),
            suggested_decisions: Vec::new(),
            created_at,
        };
        tree.nodes.push(node.clone());

        Ok(BranchCreated {
            new_node_id: new_id,
            nodes: vec![parent, node],
        })
    }

    async fn list_stories(&self) -> Result<Vec<StorySummary>, NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(GatewayCall::ListStories);
        Ok(backend.stories.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn resolve_video(
        &self,
        story_id: Uuid,
        node_id: Uuid,
    ) -> Result<String, NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend
            .calls
            .push(GatewayCall::ResolveVideo { story_id, node_id });
        Ok(format!("memory://stories/{story_id}/nodes/{node_id}"))
    }

    async fn delete_story(&self, story_id: Uuid) -> Result<(), NarrativeError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(GatewayCall::DeleteStory(story_id));
        let before = backend.stories.len();
        backend.stories.retain(|(s, _)| s.story_id != story_id);
        if backend.stories.len() == before {
            return Err(NarrativeError::StoryNotFound(story_id));
        }
        Ok(())
    }
}

/// A gateway whose every call fails as if the backend were down. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingGateway;

fn unavailable<T>() -> Result<T, NarrativeError> {
    Err(NarrativeError::BackendUnavailable("connection refused".into()))
}

#[async_trait]
impl BackendGateway for FailingGateway {
    async fn create_story(&self, _genre: Genre) -> Result<StorySummary, NarrativeError> {
        unavailable()
    }

    async fn fetch_tree(&self, _story_id: Uuid) -> Result<FetchedTree, NarrativeError> {
        unavailable()
    }

    async fn create_branch(
        &self,
        _story_id: Uuid,
        _parent_node_id: Uuid,
        _decision: &str,
    ) -> Result<BranchCreated, NarrativeError> {
        unavailable()
    }

    async fn list_stories(&self) -> Result<Vec<StorySummary>, NarrativeError> {
        unavailable()
    }

    async fn resolve_video(
        &self,
        _story_id: Uuid,
        _node_id: Uuid,
    ) -> Result<String, NarrativeError> {
        unavailable()
    }

    async fn delete_story(&self, _story_id: Uuid) -> Result<(), NarrativeError> {
        unavailable()
    }
}
