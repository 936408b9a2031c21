//! The narrative session store.
//!
//! [`NarrativeStore`] is the sole owner of mutable narrative state. Every
//! operation that talks to the backend is split into three steps:
//!
//! 1. `begin_*` validates, marks the session as loading and hands out a
//!    ticket tagged with the session epoch.
//! 2. The caller awaits the gateway call without holding the store.
//! 3. `complete_*` checks the ticket against the current epoch and either
//!    commits the response in one step or discards it as stale.
//!
//! The `async` methods compose the three steps for callers that own the
//! store exclusively.

use std::sync::Arc;

use reelbranch_core::error::NarrativeError;
use reelbranch_core::gateway::{BackendGateway, BranchCreated, FetchedTree, StorySummary};
use reelbranch_core::genre::Genre;
use reelbranch_core::time::Clock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::catalog::{self, StoryListing};
use crate::domain::node::{NodeIndex, NodeRecord};
use crate::domain::prompt::{PromptConfig, PromptMachine, PromptPhase};
use crate::domain::story::{NodePointer, Story};
use crate::domain::tree::{StoryTree, build_tree};

/// Volume a fresh session starts with.
pub const DEFAULT_VOLUME: f64 = 1.0;

/// Whether a completed backend call was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was applied to the session.
    Applied,
    /// The session moved on while the call was in flight.
    Discarded,
}

/// Ticket for an in-flight story creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTicket {
    epoch: u64,
    genre: Genre,
}

impl CreateTicket {
    /// Genre requested.
    #[must_use]
    pub fn genre(&self) -> Genre {
        self.genre
    }
}

/// Ticket for an in-flight story load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    epoch: u64,
    story_id: Uuid,
}

impl LoadTicket {
    /// Story being loaded.
    #[must_use]
    pub fn story_id(&self) -> Uuid {
        self.story_id
    }
}

/// Ticket for an in-flight branch creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTicket {
    epoch: u64,
    story_id: Uuid,
    parent_node_id: Uuid,
    decision: String,
}

impl DecisionTicket {
    /// Story the branch is created in.
    #[must_use]
    pub fn story_id(&self) -> Uuid {
        self.story_id
    }

    /// Node the decision was made on.
    #[must_use]
    pub fn parent_node_id(&self) -> Uuid {
        self.parent_node_id
    }

    /// Decision text.
    #[must_use]
    pub fn decision(&self) -> &str {
        &self.decision
    }
}

/// Ticket for an in-flight story list refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    epoch: u64,
}

#[derive(Debug, Clone)]
struct SessionState {
    current_story: Option<Story>,
    tree: Option<StoryTree>,
    prompt: PromptMachine,
    is_playing: bool,
    volume: f64,
    show_decision_prompt: bool,
    playback_position: f64,
    playback_duration: f64,
    is_loading: bool,
    last_error: Option<NarrativeError>,
}

impl SessionState {
    fn empty(config: PromptConfig) -> Self {
        Self {
            current_story: None,
            tree: None,
            prompt: PromptMachine::new(config),
            is_playing: false,
            volume: DEFAULT_VOLUME,
            show_decision_prompt: false,
            playback_position: 0.0,
            playback_duration: 0.0,
            is_loading: false,
            last_error: None,
        }
    }

    /// Resets playback for a newly activated node.
    fn activate(&mut self, node_id: Uuid) {
        if let Some(story) = self.current_story.as_mut() {
            story.current_node = NodePointer::Node(node_id);
        }
        self.prompt.restart();
        self.show_decision_prompt = false;
        self.playback_position = 0.0;
        self.playback_duration = 0.0;
        self.is_playing = true;
    }
}

/// Stateful narrative engine for one user session.
pub struct NarrativeStore {
    gateway: Arc<dyn BackendGateway>,
    clock: Arc<dyn Clock>,
    config: PromptConfig,
    session: SessionState,
    epoch: u64,
    stories: Vec<StoryListing>,
    refreshing: bool,
}

impl NarrativeStore {
    /// Creates an empty session backed by `gateway`.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        clock: Arc<dyn Clock>,
        config: PromptConfig,
    ) -> Self {
        Self {
            gateway,
            clock,
            config,
            session: SessionState::empty(config),
            epoch: 0,
            stories: Vec::new(),
            refreshing: false,
        }
    }

    /// The injected backend.
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn BackendGateway> {
        Arc::clone(&self.gateway)
    }

    // ---- reads -----------------------------------------------------------

    /// The loaded story, or the creation placeholder.
    #[must_use]
    pub fn current_story(&self) -> Option<&Story> {
        self.session.current_story.as_ref()
    }

    /// The node the current story points at. Absent when nothing is loaded,
    /// while pending, or if the pointer is stale.
    #[must_use]
    pub fn current_node(&self) -> Option<&NodeRecord> {
        let node_id = self.session.current_story.as_ref()?.current_node.node_id()?;
        self.session.tree.as_ref()?.get(node_id)
    }

    /// The loaded story tree.
    #[must_use]
    pub fn tree(&self) -> Option<&StoryTree> {
        self.session.tree.as_ref()
    }

    /// Id index of the loaded story.
    #[must_use]
    pub fn nodes_by_id(&self) -> Option<&NodeIndex> {
        self.session.tree.as_ref().map(StoryTree::index)
    }

    /// Whether playback should be running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.session.is_playing
    }

    /// Playback volume in `[0, 1]`.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.session.volume
    }

    /// Whether the decision prompt is visible.
    #[must_use]
    pub fn show_decision_prompt(&self) -> bool {
        self.session.show_decision_prompt
    }

    /// Prompt lifecycle phase of the active node.
    #[must_use]
    pub fn prompt_phase(&self) -> PromptPhase {
        self.session.prompt.phase()
    }

    /// Last reported playback position, in seconds.
    #[must_use]
    pub fn playback_position(&self) -> f64 {
        self.session.playback_position
    }

    /// Last reported segment duration, in seconds.
    #[must_use]
    pub fn playback_duration(&self) -> f64 {
        self.session.playback_duration
    }

    /// Whether a create, load or decision call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.session.is_loading
    }

    /// Whether a story list refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// The most recent failure, cleared when an operation starts or succeeds.
    #[must_use]
    pub fn last_error(&self) -> Option<&NarrativeError> {
        self.session.last_error.as_ref()
    }

    /// Stories known from the last list refresh or creation.
    #[must_use]
    pub fn stories(&self) -> &[StoryListing] {
        &self.stories
    }

    fn known_story(&self, story_id: Uuid) -> Option<&StoryListing> {
        self.stories.iter().find(|l| l.summary.story_id == story_id)
    }

    // ---- error bookkeeping ----------------------------------------------

    /// Records the failure of a completed backend call.
    fn fail(&mut self, error: NarrativeError) -> NarrativeError {
        warn!(code = error.code(), %error, "narrative operation failed");
        self.session.is_loading = false;
        self.session.last_error = Some(error.clone());
        error
    }

    /// Records a rejected request without touching in-flight calls.
    fn reject(&mut self, error: NarrativeError) -> NarrativeError {
        warn!(code = error.code(), %error, "narrative request rejected");
        self.session.last_error = Some(error.clone());
        error
    }

    fn stale(&self, epoch: u64, operation: &'static str) -> bool {
        let stale = epoch != self.epoch;
        if stale {
            debug!(
                operation,
                ticket_epoch = epoch,
                session_epoch = self.epoch,
                "discarding stale response"
            );
        }
        stale
    }

    // ---- createStory ----------------------------------------------------

    /// Replaces the session with a pending placeholder story.
    pub fn begin_create_story(&mut self, genre: Genre) -> CreateTicket {
        self.epoch += 1;
        self.session = SessionState::empty(self.config);
        self.session.current_story = Some(Story::placeholder(genre, self.clock.now()));
        self.session.is_loading = true;
        info!(%genre, epoch = self.epoch, "story creation started");
        CreateTicket {
            epoch: self.epoch,
            genre,
        }
    }

    /// Commits a generated story and its fetched tree.
    ///
    /// # Errors
    ///
    /// Returns the gateway error or `MalformedTree`; the placeholder is
    /// dropped in both cases.
    pub fn complete_create_story(
        &mut self,
        ticket: CreateTicket,
        result: Result<(StorySummary, FetchedTree), NarrativeError>,
    ) -> Result<Completion, NarrativeError> {
        if self.stale(ticket.epoch, "create_story") {
            return Ok(Completion::Discarded);
        }

        let built = result.and_then(|(summary, fetched)| {
            build_tree(summary.story_id, fetched.root_node_id, &fetched.nodes)
                .map(|tree| (summary, tree))
        });
        let (summary, tree) = match built {
            Ok(built) => built,
            Err(e) => {
                self.session.current_story = None;
                return Err(self.fail(e));
            }
        };

        let now = self.clock.now();
        let root_id = tree.root_id();
        let thumbnail_ref = tree.thumbnail_ref().map(str::to_owned);
        self.epoch += 1;
        self.session.current_story = Some(Story::opened(&summary, root_id, now));
        self.session.tree = Some(tree);
        self.session.activate(root_id);
        self.session.is_loading = false;
        self.session.last_error = None;

        if self.known_story(summary.story_id).is_none() {
            self.stories.push(StoryListing {
                summary: summary.clone(),
                thumbnail_ref,
            });
        }

        info!(story_id = %summary.story_id, root_id = %root_id, "story created");
        Ok(Completion::Applied)
    }

    /// Generates a new story and opens it at its root.
    ///
    /// # Errors
    ///
    /// Returns the error recorded as the session's last error.
    #[instrument(skip(self))]
    pub async fn create_story(&mut self, genre: Genre) -> Result<(), NarrativeError> {
        let ticket = self.begin_create_story(genre);
        let result = generate_story(self.gateway.as_ref(), genre).await;
        self.complete_create_story(ticket, result).map(|_| ())
    }

    // ---- loadStory ------------------------------------------------------

    /// Starts loading a known story. The current session stays readable
    /// until the load completes.
    ///
    /// # Errors
    ///
    /// Returns `StoryNotFound` if the story is not in the story list.
    pub fn begin_load_story(&mut self, story_id: Uuid) -> Result<LoadTicket, NarrativeError> {
        if self.known_story(story_id).is_none() {
            return Err(self.reject(NarrativeError::StoryNotFound(story_id)));
        }
        self.epoch += 1;
        self.session.is_loading = true;
        self.session.last_error = None;
        info!(%story_id, epoch = self.epoch, "story load started");
        Ok(LoadTicket {
            epoch: self.epoch,
            story_id,
        })
    }

    /// Replaces the session with the fetched story, positioned on its most
    /// recently created node.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, `MalformedTree`, or `StoryNotFound` if the
    /// story left the list meanwhile. Prior session state is kept.
    pub fn complete_load_story(
        &mut self,
        ticket: LoadTicket,
        result: Result<FetchedTree, NarrativeError>,
    ) -> Result<Completion, NarrativeError> {
        if self.stale(ticket.epoch, "load_story") {
            return Ok(Completion::Discarded);
        }
        let story_id = ticket.story_id;

        let fetched = result.map_err(|e| self.fail(e))?;
        let tree = build_tree(story_id, fetched.root_node_id, &fetched.nodes)
            .map_err(|e| self.fail(e))?;
        let known = self.known_story(story_id).map(|l| l.summary.clone());
        let Some(summary) = known else {
            return Err(self.fail(NarrativeError::StoryNotFound(story_id)));
        };

        let now = self.clock.now();
        let resume_at = tree.latest_node().map_or(tree.root_id(), |n| n.id);

        let mut session = SessionState::empty(self.config);
        session.volume = self.session.volume;
        session.current_story = Some(Story::opened(&summary, resume_at, now));
        session.tree = Some(tree);
        session.activate(resume_at);
        self.session = session;
        self.epoch += 1;

        if let Some(listing) = self
            .stories
            .iter_mut()
            .find(|l| l.summary.story_id == story_id)
        {
            listing.summary.last_played_at = now;
        }

        info!(%story_id, node_id = %resume_at, "story loaded");
        Ok(Completion::Applied)
    }

    /// Loads a known story and resumes at its newest node.
    ///
    /// # Errors
    ///
    /// Returns the error recorded as the session's last error.
    #[instrument(skip(self))]
    pub async fn load_story(&mut self, story_id: Uuid) -> Result<(), NarrativeError> {
        let ticket = self.begin_load_story(story_id)?;
        let result = self.gateway.fetch_tree(story_id).await;
        self.complete_load_story(ticket, result).map(|_| ())
    }

    // ---- closeStory -----------------------------------------------------

    /// Clears every piece of session state. Responses still in flight will
    /// be discarded on arrival.
    pub fn close_story(&mut self) {
        self.epoch += 1;
        self.session = SessionState::empty(self.config);
        info!(epoch = self.epoch, "story closed");
    }

    // ---- navigateToNode -------------------------------------------------

    /// Moves to any node of the loaded tree.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is not in the index; the current
    /// node is left unchanged.
    pub fn navigate_to_node(&mut self, node_id: Uuid) -> Result<(), NarrativeError> {
        let known = self
            .session
            .tree
            .as_ref()
            .is_some_and(|tree| tree.contains(node_id));
        if !known || self.session.current_story.is_none() {
            return Err(self.reject(NarrativeError::NodeNotFound(node_id)));
        }

        self.session.activate(node_id);
        self.session.last_error = None;
        info!(%node_id, "navigated to node");
        Ok(())
    }

    // ---- makeDecision ---------------------------------------------------

    /// Starts a branch creation from the current node.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveStory` if no story node is active.
    pub fn begin_decision(&mut self, decision: &str) -> Result<DecisionTicket, NarrativeError> {
        let target = self
            .current_node()
            .zip(self.session.current_story.as_ref())
            .map(|(node, story)| (story.id, node.id));
        let Some((story_id, parent_node_id)) = target else {
            return Err(self.reject(NarrativeError::NoActiveStory));
        };

        self.session.is_loading = true;
        self.session.last_error = None;
        info!(%story_id, %parent_node_id, "branch creation started");
        Ok(DecisionTicket {
            epoch: self.epoch,
            story_id,
            parent_node_id,
            decision: decision.to_owned(),
        })
    }

    /// Merges the generated branch into the index and moves onto it.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `BackendUnavailable` if the response
    /// does not contain the node it announced. Prior state is kept.
    pub fn complete_decision(
        &mut self,
        ticket: &DecisionTicket,
        result: Result<BranchCreated, NarrativeError>,
    ) -> Result<Completion, NarrativeError> {
        let same_story = self
            .session
            .current_story
            .as_ref()
            .is_some_and(|s| s.id == ticket.story_id);
        if self.stale(ticket.epoch, "make_decision") || !same_story {
            return Ok(Completion::Discarded);
        }

        let created = result.map_err(|e| self.fail(e))?;
        let merged = match self
            .session
            .tree
            .as_ref()
            .map(|tree| tree.merge(ticket.story_id, &created.nodes))
        {
            Some(Ok(merged)) => merged,
            Some(Err(e)) => return Err(self.fail(e)),
            None => return Err(self.fail(NarrativeError::NoActiveStory)),
        };
        if !merged.contains(created.new_node_id) {
            return Err(self.fail(NarrativeError::BackendUnavailable(format!(
                "branch response does not contain new node {}",
                created.new_node_id
            ))));
        }

        self.session.tree = Some(merged);
        self.session.activate(created.new_node_id);
        self.session.is_loading = false;
        self.session.last_error = None;

        info!(
            story_id = %ticket.story_id,
            parent_node_id = %ticket.parent_node_id,
            node_id = %created.new_node_id,
            "branch merged"
        );
        Ok(Completion::Applied)
    }

    /// Generates a branch for `decision` and moves onto it.
    ///
    /// # Errors
    ///
    /// Returns the error recorded as the session's last error.
    #[instrument(skip(self))]
    pub async fn make_decision(&mut self, decision: &str) -> Result<(), NarrativeError> {
        let ticket = self.begin_decision(decision)?;
        let result = self
            .gateway
            .create_branch(ticket.story_id, ticket.parent_node_id, &ticket.decision)
            .await;
        self.complete_decision(&ticket, result).map(|_| ())
    }

    // ---- playback -------------------------------------------------------

    /// Records playback progress and raises the decision prompt the first
    /// time the segment enters its near-end window.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveStory` if no story node is active.
    pub fn update_playback_progress(
        &mut self,
        position: f64,
        duration: f64,
    ) -> Result<(), NarrativeError> {
        if self.current_node().is_none() {
            return Err(self.reject(NarrativeError::NoActiveStory));
        }

        self.session.playback_position = position;
        self.session.playback_duration = duration;

        if self.session.prompt.observe(position, duration) {
            self.session.is_playing = false;
            self.session.show_decision_prompt = true;
            self.session.prompt.commit_prompt();
            info!(position, duration, "decision prompt shown");
        }
        Ok(())
    }

    /// Starts or pauses playback. Starting is ignored while the decision
    /// prompt is up.
    pub fn set_playing(&mut self, playing: bool) {
        if playing && self.session.prompt.phase() == PromptPhase::PromptShown {
            debug!("ignoring play request while prompt is shown");
            return;
        }
        self.session.is_playing = playing;
    }

    /// Sets the volume, clamped into `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_finite() {
            self.session.volume = volume.clamp(0.0, 1.0);
        }
    }

    /// Story and node whose video should be playing.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveStory` if no story node is active.
    pub fn video_target(&self) -> Result<(Uuid, Uuid), NarrativeError> {
        let story = self
            .session
            .current_story
            .as_ref()
            .ok_or(NarrativeError::NoActiveStory)?;
        let node = self.current_node().ok_or(NarrativeError::NoActiveStory)?;
        Ok((story.id, node.id))
    }

    /// Resolves a playable reference for the current node.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveStory` or the gateway error.
    #[instrument(skip(self))]
    pub async fn resolve_current_video(&self) -> Result<String, NarrativeError> {
        let (story_id, node_id) = self.video_target()?;
        self.gateway.resolve_video(story_id, node_id).await
    }

    // ---- story list -----------------------------------------------------

    /// Marks a story list refresh as in flight. The session's own loading
    /// flag is left to the operation that owns it.
    pub fn begin_refresh_stories(&mut self) -> RefreshTicket {
        self.refreshing = true;
        RefreshTicket { epoch: self.epoch }
    }

    /// Replaces the known story list. A failure is recorded as the last
    /// error only if the session has not moved on; an in-flight create,
    /// load or decision keeps the session busy either way.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the previous list is kept.
    pub fn complete_refresh_stories(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<StoryListing>, NarrativeError>,
    ) -> Result<Completion, NarrativeError> {
        self.refreshing = false;
        let current = !self.stale(ticket.epoch, "refresh_stories");
        match result {
            Ok(listings) => {
                info!(count = listings.len(), "story list refreshed");
                self.stories = listings;
                Ok(Completion::Applied)
            }
            Err(e) if current => Err(self.reject(e)),
            Err(e) => Err(e),
        }
    }

    /// Refreshes the known story list and thumbnails.
    ///
    /// # Errors
    ///
    /// Returns the error recorded as the session's last error.
    #[instrument(skip(self))]
    pub async fn fetch_stories(&mut self) -> Result<(), NarrativeError> {
        let ticket = self.begin_refresh_stories();
        let result = catalog::fetch_listings(self.gateway.as_ref()).await;
        self.complete_refresh_stories(ticket, result).map(|_| ())
    }

    /// Checks that a story can be deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoryNotFound` if the story is not in the story list.
    pub fn begin_delete_story(&mut self, story_id: Uuid) -> Result<(), NarrativeError> {
        if self.known_story(story_id).is_none() {
            return Err(self.reject(NarrativeError::StoryNotFound(story_id)));
        }
        Ok(())
    }

    /// Forgets a deleted story, closing the session if it was open.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the story stays listed.
    pub fn complete_delete_story(
        &mut self,
        story_id: Uuid,
        result: Result<(), NarrativeError>,
    ) -> Result<(), NarrativeError> {
        result.map_err(|e| self.reject(e))?;
        self.stories.retain(|l| l.summary.story_id != story_id);
        if self
            .session
            .current_story
            .as_ref()
            .is_some_and(|s| s.id == story_id)
        {
            self.close_story();
        }
        info!(%story_id, "story deleted");
        Ok(())
    }

    /// Deletes a known story on the backend.
    ///
    /// # Errors
    ///
    /// Returns `StoryNotFound` or the gateway error.
    #[instrument(skip(self))]
    pub async fn delete_story(&mut self, story_id: Uuid) -> Result<(), NarrativeError> {
        self.begin_delete_story(story_id)?;
        let result = self.gateway.delete_story(story_id).await;
        self.complete_delete_story(story_id, result)
    }
}

/// Creates a story on the backend and fetches its tree.
///
/// # Errors
///
/// Returns the first gateway error.
pub async fn generate_story(
    gateway: &dyn BackendGateway,
    genre: Genre,
) -> Result<(StorySummary, FetchedTree), NarrativeError> {
    let summary = gateway.create_story(genre).await?;
    let fetched = gateway.fetch_tree(summary.story_id).await?;
    Ok((summary, fetched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelbranch_test_support::{
        FailingGateway, FixedClock, GatewayCall, InMemoryGateway, flat_node, minute,
    };

    fn store_with(gateway: Arc<dyn BackendGateway>) -> NarrativeStore {
        NarrativeStore::new(
            gateway,
            Arc::new(FixedClock(minute(60))),
            PromptConfig::default(),
        )
    }

    struct Seeded {
        gateway: Arc<InMemoryGateway>,
        story_id: Uuid,
        root: Uuid,
        left: Uuid,
        right: Uuid,
        newest: Uuid,
    }

    /// root -> (left -> (newest), right); created at minutes 0, 1, 3, 2.
    fn seeded() -> Seeded {
        let root = Uuid::new_v4();
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();
        let newest = Uuid::new_v4();
        let gateway = Arc::new(InMemoryGateway::new());
        let summary = gateway.insert_story(
            "The Lighthouse",
            Genre::Mystery,
            FetchedTree {
                root_node_id: root,
                nodes: vec![
                    flat_node(root, None, &[left, right], minute(0)),
                    flat_node(left, Some(root), &[newest], minute(1)),
                    flat_node(right, Some(root), &[], minute(2)),
                    flat_node(newest, Some(left), &[], minute(3)),
                ],
            },
        );
        Seeded {
            gateway,
            story_id: summary.story_id,
            root,
            left,
            right,
            newest,
        }
    }

    async fn loaded() -> (NarrativeStore, Seeded) {
        let seeded = seeded();
        let mut store = store_with(seeded.gateway.clone());
        store.fetch_stories().await.unwrap();
        store.load_story(seeded.story_id).await.unwrap();
        (store, seeded)
    }

    #[tokio::test]
    async fn test_load_story_resumes_at_latest_node() {
        // Arrange
        let seeded = seeded();
        let mut store = store_with(seeded.gateway.clone());
        store.fetch_stories().await.unwrap();

        // Act
        store.load_story(seeded.story_id).await.unwrap();

        // Assert
        assert_eq!(store.current_node().unwrap().id, seeded.newest);
        assert_eq!(store.nodes_by_id().unwrap().len(), 4);
        assert!(store.is_playing());
        assert!(!store.show_decision_prompt());
        assert!(!store.is_loading());
        assert_eq!(store.current_story().unwrap().last_played_at, minute(60));
    }

    #[tokio::test]
    async fn test_load_unknown_story_fails_without_backend_call() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut store = store_with(gateway.clone());
        let story_id = Uuid::new_v4();

        let result = store.load_story(story_id).await;

        assert_eq!(result, Err(NarrativeError::StoryNotFound(story_id)));
        assert_eq!(
            store.last_error(),
            Some(&NarrativeError::StoryNotFound(story_id))
        );
        assert!(gateway.calls().is_empty());
        assert!(store.current_story().is_none());
    }

    #[tokio::test]
    async fn test_navigate_to_ancestor_clears_prompt() {
        // Arrange
        let (mut store, seeded) = loaded().await;
        store.update_playback_progress(99.0, 100.0).unwrap();
        assert!(store.show_decision_prompt());

        // Act
        store.navigate_to_node(seeded.root).unwrap();

        // Assert
        assert_eq!(store.current_node().unwrap().id, seeded.root);
        assert!(!store.show_decision_prompt());
        assert_eq!(store.prompt_phase(), PromptPhase::Playing);
        assert!(store.playback_position().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_navigate_to_unknown_node_keeps_state() {
        let (mut store, seeded) = loaded().await;
        let missing = Uuid::new_v4();

        let result = store.navigate_to_node(missing);

        assert_eq!(result, Err(NarrativeError::NodeNotFound(missing)));
        assert_eq!(store.current_node().unwrap().id, seeded.newest);
        assert_eq!(
            store.last_error(),
            Some(&NarrativeError::NodeNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_prompt_is_edge_triggered() {
        // Arrange
        let (mut store, seeded) = loaded().await;

        // Act / Assert
        store.update_playback_progress(50.0, 100.0).unwrap();
        assert!(!store.show_decision_prompt());

        store.update_playback_progress(94.0, 100.0).unwrap();
        assert!(store.show_decision_prompt());
        assert!(!store.is_playing());

        store.set_playing(true);
        store.update_playback_progress(96.0, 100.0).unwrap();
        assert!(store.show_decision_prompt());
        assert!(!store.is_playing());
        assert_eq!(store.prompt_phase(), PromptPhase::PromptShown);
        assert!((store.playback_position() - 96.0).abs() < f64::EPSILON);

        store.navigate_to_node(seeded.right).unwrap();
        assert!(!store.show_decision_prompt());
        assert!(store.is_playing());
    }

    #[tokio::test]
    async fn test_leaf_node_still_reaches_prompt() {
        let (mut store, seeded) = loaded().await;
        assert!(store.tree().unwrap().get(seeded.newest).unwrap().is_leaf());

        store.update_playback_progress(12.0, 12.0).unwrap();

        assert!(store.show_decision_prompt());
    }

    #[tokio::test]
    async fn test_progress_without_story_is_rejected() {
        let mut store = store_with(Arc::new(InMemoryGateway::new()));

        let result = store.update_playback_progress(1.0, 10.0);

        assert_eq!(result, Err(NarrativeError::NoActiveStory));
        assert_eq!(store.last_error(), Some(&NarrativeError::NoActiveStory));
    }

    #[tokio::test]
    async fn test_make_decision_merges_branch_under_current_node() {
        // Arrange
        let (mut store, seeded) = loaded().await;
        let before = store.nodes_by_id().unwrap().clone();
        store.update_playback_progress(100.0, 100.0).unwrap();

        // Act
        store.make_decision("go north").await.unwrap();

        // Assert
        let after = store.nodes_by_id().unwrap();
        assert_eq!(after.len(), before.len() + 1);
        let new_node = store.current_node().unwrap();
        assert_eq!(new_node.parent_id, Some(seeded.newest));
        assert_eq!(new_node.decision.as_deref(), Some("go north"));
        assert!(!before.contains_key(&new_node.id));
        for (id, record) in &before {
            let merged = &after[id];
            assert_eq!(merged.content, record.content);
            assert_eq!(merged.parent_id, record.parent_id);
            if *id != seeded.newest {
                assert_eq!(merged, record);
            }
        }
        assert_eq!(after[&seeded.newest].children, vec![new_node.id]);
        assert!(!store.show_decision_prompt());
        assert!(store.is_playing());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_make_decision_without_story_fails() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut store = store_with(gateway.clone());

        let result = store.make_decision("go north").await;

        assert_eq!(result, Err(NarrativeError::NoActiveStory));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_make_decision_backend_failure_keeps_state() {
        let (mut store, seeded) = loaded().await;
        let ticket = store.begin_decision("go north").unwrap();
        assert!(store.is_loading());

        let result = store.complete_decision(
            &ticket,
            Err(NarrativeError::BackendUnavailable("timeout".into())),
        );

        assert!(matches!(result, Err(NarrativeError::BackendUnavailable(_))));
        assert!(!store.is_loading());
        assert_eq!(store.current_node().unwrap().id, seeded.newest);
        assert_eq!(store.nodes_by_id().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_create_story_exposes_placeholder_then_opens_root() {
        // Arrange
        let gateway = Arc::new(InMemoryGateway::new());
        let mut store = store_with(gateway.clone());

        // Act
        let ticket = store.begin_create_story(Genre::Fantasy);

        // Assert
        let placeholder = store.current_story().unwrap();
        assert!(placeholder.is_pending());
        assert_eq!(placeholder.genre, Genre::Fantasy);
        assert!(store.is_loading());
        assert!(store.current_node().is_none());

        let result = generate_story(gateway.as_ref(), Genre::Fantasy).await;
        let completion = store.complete_create_story(ticket, result).unwrap();

        assert_eq!(completion, Completion::Applied);
        let story = store.current_story().unwrap();
        assert!(!story.is_pending());
        assert_eq!(
            store.current_node().unwrap().id,
            story.root_node_id.unwrap()
        );
        assert!(store.is_playing());
        assert!(!store.is_loading());
        assert_eq!(store.stories().len(), 1);
    }

    #[tokio::test]
    async fn test_create_story_failure_abandons_placeholder() {
        let mut store = store_with(Arc::new(FailingGateway));

        let result = store.create_story(Genre::Horror).await;

        assert!(matches!(result, Err(NarrativeError::BackendUnavailable(_))));
        assert!(store.current_story().is_none());
        assert!(!store.is_loading());
        assert!(store.stories().is_empty());
        assert!(matches!(
            store.last_error(),
            Some(NarrativeError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_load_response_after_close_is_discarded() {
        // Arrange
        let seeded = seeded();
        let mut store = store_with(seeded.gateway.clone());
        store.fetch_stories().await.unwrap();
        let ticket = store.begin_load_story(seeded.story_id).unwrap();
        let fetched = seeded.gateway.fetch_tree(seeded.story_id).await;

        // Act
        store.close_story();
        let completion = store.complete_load_story(ticket, fetched).unwrap();

        // Assert
        assert_eq!(completion, Completion::Discarded);
        assert!(store.current_story().is_none());
        assert!(store.nodes_by_id().is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_second_load_wins_over_first() {
        // Arrange
        let seeded = seeded();
        let other_root = Uuid::new_v4();
        let other = seeded.gateway.insert_story(
            "Second",
            Genre::Comedy,
            FetchedTree {
                root_node_id: other_root,
                nodes: vec![flat_node(other_root, None, &[], minute(0))],
            },
        );
        let mut store = store_with(seeded.gateway.clone());
        store.fetch_stories().await.unwrap();

        let first = store.begin_load_story(seeded.story_id).unwrap();
        let second = store.begin_load_story(other.story_id).unwrap();
        let first_tree = seeded.gateway.fetch_tree(seeded.story_id).await;
        let second_tree = seeded.gateway.fetch_tree(other.story_id).await;

        // Act
        let second_completion = store.complete_load_story(second, second_tree).unwrap();
        let first_completion = store.complete_load_story(first, first_tree).unwrap();

        // Assert
        assert_eq!(second_completion, Completion::Applied);
        assert_eq!(first_completion, Completion::Discarded);
        assert_eq!(store.current_story().unwrap().id, other.story_id);
        assert_eq!(store.current_node().unwrap().id, other_root);
    }

    #[tokio::test]
    async fn test_decision_response_for_previous_story_is_discarded() {
        let (mut store, seeded) = loaded().await;
        let ticket = store.begin_decision("open the door").unwrap();
        let created = seeded
            .gateway
            .create_branch(seeded.story_id, seeded.newest, "open the door")
            .await;

        store.close_story();
        let completion = store.complete_decision(&ticket, created).unwrap();

        assert_eq!(completion, Completion::Discarded);
        assert!(store.nodes_by_id().is_none());
    }

    #[tokio::test]
    async fn test_malformed_tree_on_load_keeps_prior_story() {
        let (mut store, seeded) = loaded().await;
        let ticket = store.begin_load_story(seeded.story_id).unwrap();

        let result = store.complete_load_story(
            ticket,
            Ok(FetchedTree {
                root_node_id: Uuid::new_v4(),
                nodes: Vec::new(),
            }),
        );

        assert!(matches!(result, Err(NarrativeError::MalformedTree { .. })));
        assert_eq!(store.current_node().unwrap().id, seeded.newest);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_close_story_resets_session_defaults() {
        let (mut store, _) = loaded().await;
        store.set_volume(0.3);
        store.update_playback_progress(99.0, 100.0).unwrap();

        store.close_story();

        assert!(store.current_story().is_none());
        assert!(store.current_node().is_none());
        assert!(!store.is_playing());
        assert!(!store.show_decision_prompt());
        assert!((store.volume() - DEFAULT_VOLUME).abs() < f64::EPSILON);
        assert!(store.last_error().is_none());
        assert_eq!(store.stories().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_stories_tolerates_missing_thumbnail_trees() {
        // Arrange
        let seeded = seeded();
        let broken = seeded.gateway.insert_story(
            "Broken",
            Genre::Drama,
            FetchedTree {
                root_node_id: Uuid::new_v4(),
                nodes: Vec::new(),
            },
        );
        let mut unreachable_tree_root = flat_node(Uuid::new_v4(), None, &[], minute(0));
        unreachable_tree_root.thumbnail_ref = Some("thumb.png".into());
        let offline = seeded.gateway.insert_story(
            "Offline",
            Genre::Drama,
            FetchedTree {
                root_node_id: unreachable_tree_root.id,
                nodes: vec![unreachable_tree_root],
            },
        );
        seeded.gateway.fail_fetches_for(offline.story_id);
        let mut store = store_with(seeded.gateway.clone());

        // Act
        store.fetch_stories().await.unwrap();

        // Assert
        assert_eq!(store.stories().len(), 3);
        for listing in store.stories() {
            let id = listing.summary.story_id;
            if id == broken.story_id || id == offline.story_id {
                assert!(listing.thumbnail_ref.is_none());
            }
        }
        assert!(store.nodes_by_id().is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_during_decision_keeps_session_busy() {
        // Arrange
        let (mut store, seeded) = loaded().await;
        let ticket = store.begin_decision("go north").unwrap();

        // Act
        let refresh = store.begin_refresh_stories();
        assert!(store.is_refreshing());
        let listings = catalog::fetch_listings(seeded.gateway.as_ref()).await;
        store.complete_refresh_stories(refresh, listings).unwrap();

        // Assert
        assert!(store.is_loading());
        assert!(!store.is_refreshing());

        let created = seeded
            .gateway
            .create_branch(ticket.story_id(), ticket.parent_node_id(), ticket.decision())
            .await;
        store.complete_decision(&ticket, created).unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_failed_refresh_during_load_keeps_session_busy() {
        let (mut store, seeded) = loaded().await;
        let load = store.begin_load_story(seeded.story_id).unwrap();

        let refresh = store.begin_refresh_stories();
        let result = store.complete_refresh_stories(
            refresh,
            Err(NarrativeError::BackendUnavailable("connection refused".into())),
        );

        assert!(result.is_err());
        assert!(store.is_loading());
        assert_eq!(store.stories().len(), 1);
        assert_eq!(store.last_error().map(NarrativeError::code), Some("backend_unavailable"));
        let fetched = seeded.gateway.fetch_tree(seeded.story_id).await;
        store.complete_load_story(load, fetched).unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_delete_current_story_closes_session() {
        let (mut store, seeded) = loaded().await;

        store.delete_story(seeded.story_id).await.unwrap();

        assert!(store.current_story().is_none());
        assert!(store.stories().is_empty());
        assert!(
            seeded
                .gateway
                .calls()
                .contains(&GatewayCall::DeleteStory(seeded.story_id))
        );
    }

    #[tokio::test]
    async fn test_resolve_current_video_targets_current_node() {
        let (store, seeded) = loaded().await;

        let video = store.resolve_current_video().await.unwrap();

        assert!(video.contains(&seeded.newest.to_string()));
        assert!(video.contains(&seeded.story_id.to_string()));
    }

    #[tokio::test]
    async fn test_set_volume_clamps_into_unit_range() {
        let mut store = store_with(Arc::new(InMemoryGateway::new()));

        store.set_volume(1.7);
        assert!((store.volume() - 1.0).abs() < f64::EPSILON);

        store.set_volume(-0.2);
        assert!(store.volume().abs() < f64::EPSILON);

        store.set_volume(f64::NAN);
        assert!(store.volume().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_navigate_within_loaded_story_uses_no_backend() {
        let (mut store, seeded) = loaded().await;
        let calls_before = seeded.gateway.calls().len();

        store.navigate_to_node(seeded.left).unwrap();

        assert_eq!(store.current_node().unwrap().id, seeded.left);
        assert_eq!(seeded.gateway.calls().len(), calls_before);
    }
}
