//! `reqwest` implementation of the `BackendGateway` trait.

use std::time::Duration;

use async_trait::async_trait;
use reelbranch_core::error::NarrativeError;
use reelbranch_core::gateway::{
    BackendGateway, BranchCreated, FetchedTree, StorySummary,
};
use reelbranch_core::genre::Genre;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::wire::{CreateBranchBody, CreateStoryBody, StoryDocument};

/// Default narration language.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Default per-request timeout. Story and branch generation render video,
/// so this is generous.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for the story backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Narration language sent with story creation requests.
    pub language_code: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Settings for `base_url` with default language and timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            language_code: DEFAULT_LANGUAGE_CODE.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP/JSON client for the story backend.
#[derive(Debug, Clone)]
pub struct HttpBackendGateway {
    base_url: String,
    language_code: String,
    client: reqwest::Client,
}

impl HttpBackendGateway {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::BackendUnavailable` if the HTTP client cannot
    /// be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NarrativeError::BackendUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            language_code: config.language_code,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Playable URL of a node's video.
    #[must_use]
    pub fn video_url(&self, story_id: Uuid, node_id: Uuid) -> String {
        self.url(&format!("/videos/stories/{story_id}/nodes/{node_id}"))
    }
}

fn transport(e: &reqwest::Error) -> NarrativeError {
    error!(error = %e, "story backend request failed");
    NarrativeError::BackendUnavailable(e.to_string())
}

/// Rejects non-success responses. A 404 on a story route means the story is
/// gone.
fn check(response: Response, story_id: Option<Uuid>) -> Result<Response, NarrativeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    error!(%status, url = %response.url(), "story backend returned error");
    match (status, story_id) {
        (StatusCode::NOT_FOUND, Some(id)) => Err(NarrativeError::StoryNotFound(id)),
        _ => Err(NarrativeError::BackendUnavailable(format!(
            "story backend returned {status}"
        ))),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, NarrativeError> {
    response.json::<T>().await.map_err(|e| {
        error!(error = %e, "failed to decode story backend response");
        NarrativeError::BackendUnavailable(format!("invalid response body: {e}"))
    })
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    #[instrument(skip(self))]
    async fn create_story(&self, genre: Genre) -> Result<StorySummary, NarrativeError> {
        let body = CreateStoryBody {
            genre,
            language_code: &self.language_code,
        };
        let response = self
            .client
            .post(self.url("/stories"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let doc: StoryDocument = decode(check(response, None)?).await?;
        debug!(story_id = %doc.id, "story created");
        Ok(doc.summary())
    }

    #[instrument(skip(self))]
    async fn fetch_tree(&self, story_id: Uuid) -> Result<FetchedTree, NarrativeError> {
        let response = self
            .client
            .get(self.url(&format!("/stories/{story_id}")))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let doc: StoryDocument = decode(check(response, Some(story_id))?).await?;
        debug!(%story_id, nodes = doc.nodes.len(), "story tree fetched");
        Ok(doc.into_tree())
    }

    #[instrument(skip(self))]
    async fn create_branch(
        &self,
        story_id: Uuid,
        parent_node_id: Uuid,
        decision: &str,
    ) -> Result<BranchCreated, NarrativeError> {
        let body = CreateBranchBody {
            parent_node_id,
            decision,
        };
        let response = self
            .client
            .post(self.url(&format!("/stories/{story_id}/branches")))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let doc: StoryDocument = decode(check(response, Some(story_id))?).await?;
        doc.into_branch(parent_node_id).ok_or_else(|| {
            NarrativeError::BackendUnavailable(format!(
                "branch response has no child under {parent_node_id}"
            ))
        })
    }

    #[instrument(skip(self))]
    async fn list_stories(&self) -> Result<Vec<StorySummary>, NarrativeError> {
        let response = self
            .client
            .get(self.url("/stories"))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let docs: Vec<StoryDocument> = decode(check(response, None)?).await?;
        Ok(docs.iter().map(StoryDocument::summary).collect())
    }

    async fn resolve_video(
        &self,
        story_id: Uuid,
        node_id: Uuid,
    ) -> Result<String, NarrativeError> {
        Ok(self.video_url(story_id, node_id))
    }

    #[instrument(skip(self))]
    async fn delete_story(&self, story_id: Uuid) -> Result<(), NarrativeError> {
        let response = self
            .client
            .delete(self.url(&format!("/stories/{story_id}")))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check(response, Some(story_id))?;
        Ok(())
    }
}
