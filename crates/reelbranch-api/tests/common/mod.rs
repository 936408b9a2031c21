//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use reelbranch_core::gateway::{BackendGateway, FetchedTree};
use reelbranch_core::genre::Genre;
use reelbranch_narrative::domain::prompt::PromptConfig;
use reelbranch_test_support::{FixedClock, InMemoryGateway, flat_node, minute};
use tower::ServiceExt;
use uuid::Uuid;

use reelbranch_api::state::AppState;

/// Build the full app router over `gateway` with a fixed clock. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(gateway: Arc<dyn BackendGateway>) -> Router {
    let app_state = AppState::new(gateway, Arc::new(FixedClock(minute(60))), PromptConfig::default());
    reelbranch_api::app(app_state)
}

/// A seeded two-level story: a root with children `a` (older) and `b`
/// (newer), and `c` under `a` created last.
pub struct SeededStory {
    pub story_id: Uuid,
    pub root: Uuid,
    pub a: Uuid,
    pub b: Uuid,
    pub c: Uuid,
}

/// Seeds a story into `gateway`.
pub fn seed_story(gateway: &InMemoryGateway) -> SeededStory {
    let (root, a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let summary = gateway.insert_story(
        "The Lighthouse",
        Genre::Mystery,
        FetchedTree {
            root_node_id: root,
            nodes: vec![
                flat_node(root, None, &[a, b], minute(0)),
                flat_node(a, Some(root), &[c], minute(1)),
                flat_node(b, Some(root), &[], minute(2)),
                flat_node(c, Some(a), &[], minute(3)),
            ],
        },
    );
    SeededStory {
        story_id: summary.story_id,
        root,
        a,
        b,
        c,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
