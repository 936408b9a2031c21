//! Routes for the active playback session.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use reelbranch_narrative::application::query_handlers::{self, SessionView};
use reelbranch_narrative::application::store::Completion;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /navigate.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    /// Node to jump to.
    pub node_id: Uuid,
}

/// Request body for POST /decisions.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Free-text decision for the current node.
    pub decision: String,
}

/// Request body for POST /progress.
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    /// Playback position in seconds.
    pub position: f64,
    /// Segment duration in seconds.
    pub duration: f64,
}

/// Request body for POST /playing.
#[derive(Debug, Deserialize)]
pub struct PlayingRequest {
    pub playing: bool,
}

/// Request body for POST /volume.
#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: f64,
}

/// Response body for GET /video.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    /// Story the video belongs to.
    pub story_id: Uuid,
    /// Node the video belongs to.
    pub node_id: Uuid,
    /// Playable reference.
    pub url: String,
}

fn view(state: &AppState) -> Result<Json<SessionView>, ApiError> {
    let store = state.session()?;
    Ok(Json(query_handlers::session_view(&store)))
}

/// GET /
async fn get_session(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    view(&state)
}

/// POST /close
#[instrument(skip(state))]
async fn close(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    state.session()?.close_story();
    info!("session closed");
    view(&state)
}

/// POST /navigate
#[instrument(skip(state, request), fields(node_id = %request.node_id))]
async fn navigate(
    State(state): State<AppState>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.session()?.navigate_to_node(request.node_id)?;
    view(&state)
}

/// POST /decisions
#[instrument(skip(state, request))]
async fn decide(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let ticket = state.session()?.begin_decision(&request.decision)?;

    let result = state
        .gateway
        .create_branch(ticket.story_id(), ticket.parent_node_id(), ticket.decision())
        .await;

    let completion = state.session()?.complete_decision(&ticket, result)?;
    if completion == Completion::Discarded {
        info!(story_id = %ticket.story_id(), "branch arrived after the session moved on");
    }
    view(&state)
}

/// POST /progress
#[instrument(skip(state, request))]
async fn progress(
    State(state): State<AppState>,
    Json(request): Json<ProgressRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .session()?
        .update_playback_progress(request.position, request.duration)?;
    view(&state)
}

/// POST /playing
async fn playing(
    State(state): State<AppState>,
    Json(request): Json<PlayingRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.session()?.set_playing(request.playing);
    view(&state)
}

/// POST /volume
async fn volume(
    State(state): State<AppState>,
    Json(request): Json<VolumeRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.session()?.set_volume(request.volume);
    view(&state)
}

/// GET /video
#[instrument(skip(state))]
async fn video(State(state): State<AppState>) -> Result<Json<VideoResponse>, ApiError> {
    let (story_id, node_id) = state.session()?.video_target()?;
    let url = state.gateway.resolve_video(story_id, node_id).await?;
    Ok(Json(VideoResponse {
        story_id,
        node_id,
        url,
    }))
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/close", post(close))
        .route("/navigate", post(navigate))
        .route("/decisions", post(decide))
        .route("/progress", post(progress))
        .route("/playing", post(playing))
        .route("/volume", post(volume))
        .route("/video", get(video))
}
