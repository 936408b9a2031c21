//! Domain model for the narrative tree.

pub mod node;
pub mod prompt;
pub mod story;
pub mod tree;
