//! REST client for the story-generation backend.
//!
//! Implements [`reelbranch_core::gateway::BackendGateway`] over HTTP/JSON.

pub mod http_gateway;
pub mod wire;
