//! Routes for the story catalogue: listing, generation, loading and deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use reelbranch_core::genre::Genre;
use reelbranch_narrative::application::catalog::{self, StoryListing};
use reelbranch_narrative::application::query_handlers::{self, SessionView};
use reelbranch_narrative::application::store::generate_story;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// Genre of the story to generate.
    pub genre: Genre,
}

fn view(state: &AppState) -> Result<Json<SessionView>, ApiError> {
    let store = state.session()?;
    Ok(Json(query_handlers::session_view(&store)))
}

/// GET /
///
/// Refreshes the list from the backend before returning it.
#[instrument(skip(state))]
async fn list_stories(State(state): State<AppState>) -> Result<Json<Vec<StoryListing>>, ApiError> {
    let ticket = state.session()?.begin_refresh_stories();

    let result = catalog::fetch_listings(state.gateway.as_ref()).await;

    let mut store = state.session()?;
    store.complete_refresh_stories(ticket, result)?;
    Ok(Json(query_handlers::story_list(&store)))
}

/// POST /
#[instrument(skip(state, request), fields(genre = %request.genre))]
async fn create_story(
    State(state): State<AppState>,
    Json(request): Json<CreateStoryRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let ticket = state.session()?.begin_create_story(request.genre);

    let result = generate_story(state.gateway.as_ref(), request.genre).await;

    state.session()?.complete_create_story(ticket, result)?;
    view(&state)
}

/// POST /{story_id}/load
#[instrument(skip(state))]
async fn load_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let ticket = state.session()?.begin_load_story(story_id)?;

    let result = state.gateway.fetch_tree(ticket.story_id()).await;

    state.session()?.complete_load_story(ticket, result)?;
    view(&state)
}

/// DELETE /{story_id}
#[instrument(skip(state))]
async fn delete_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.session()?.begin_delete_story(story_id)?;

    let result = state.gateway.delete_story(story_id).await;

    state.session()?.complete_delete_story(story_id, result)?;
    info!(%story_id, "story removed from catalogue");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the story catalogue.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stories).post(create_story))
        .route("/{story_id}/load", post(load_story))
        .route("/{story_id}", delete(delete_story))
}
