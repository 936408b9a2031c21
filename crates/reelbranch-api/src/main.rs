//! Reelbranch API server entry point.

use std::sync::Arc;

use reelbranch_api::config::ServerConfig;
use reelbranch_api::error::AppError;
use reelbranch_api::state::AppState;
use reelbranch_core::time::SystemClock;
use reelbranch_gateway::http_gateway::HttpBackendGateway;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Reelbranch API server");

    let config = ServerConfig::from_env()?;
    tracing::info!(
        backend = %config.gateway.base_url,
        language = %config.gateway.language_code,
        near_end_threshold_secs = config.prompt.near_end_threshold_secs,
        "configuration loaded"
    );

    let gateway = HttpBackendGateway::new(config.gateway)?;
    let app_state = AppState::new(Arc::new(gateway), Arc::new(SystemClock), config.prompt);

    // TODO: Replace CorsLayer::permissive() with the presentation layer's origin.
    let app = reelbranch_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
