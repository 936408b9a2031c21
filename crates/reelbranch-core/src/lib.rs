//! Reelbranch Core: shared abstractions.
//!
//! This crate defines the error taxonomy, the time source and the contract
//! the narrative engine requires from a story-generation backend. It contains
//! no infrastructure code.

pub mod error;
pub mod gateway;
pub mod genre;
pub mod time;
