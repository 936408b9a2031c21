//! Application layer: the session store and its read-only views.

pub mod catalog;
pub mod query_handlers;
pub mod store;
