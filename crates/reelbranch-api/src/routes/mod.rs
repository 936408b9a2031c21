//! Route modules: the health check, the active session and the story catalogue.

pub mod health;
pub mod session;
pub mod stories;
