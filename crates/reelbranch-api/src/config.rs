//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use reelbranch_gateway::http_gateway::{DEFAULT_LANGUAGE_CODE, DEFAULT_TIMEOUT, GatewayConfig};
use reelbranch_narrative::domain::prompt::{DEFAULT_NEAR_END_THRESHOLD_SECS, PromptConfig};

use crate::error::AppError;

/// Everything the server needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub addr: SocketAddr,
    /// Story backend connection settings.
    pub gateway: GatewayConfig,
    /// Decision prompt timing.
    pub prompt: PromptConfig,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let base_url = lookup("STORY_BACKEND_URL").ok_or_else(|| {
            AppError::Config("STORY_BACKEND_URL environment variable must be set".to_string())
        })?;
        let language_code =
            lookup("STORY_LANGUAGE_CODE").unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string());
        let timeout = match lookup("BACKEND_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                AppError::Config(format!("BACKEND_TIMEOUT_SECS must be whole seconds: {e}"))
            })?),
            None => DEFAULT_TIMEOUT,
        };

        let near_end_threshold_secs = match lookup("NEAR_END_THRESHOLD_SECS") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_NEAR_END_THRESHOLD_SECS,
        };

        Ok(Self {
            addr,
            gateway: GatewayConfig {
                base_url,
                language_code,
                timeout,
            },
            prompt: PromptConfig {
                near_end_threshold_secs,
            },
        })
    }
}

fn parse_threshold(raw: &str) -> Result<f64, AppError> {
    let secs: f64 = raw
        .parse()
        .map_err(|e| AppError::Config(format!("NEAR_END_THRESHOLD_SECS must be a number: {e}")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(AppError::Config(format!(
            "NEAR_END_THRESHOLD_SECS must be a non-negative number, got {raw}"
        )));
    }
    Ok(secs)
}
