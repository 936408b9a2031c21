//! Reelbranch narrative tree model and synchronization engine.
//!
//! Responsible for rebuilding story trees from backend node lists, keeping
//! the node index consistent as branches are generated, navigation across
//! the tree and the decision prompt lifecycle.

pub mod application;
pub mod domain;
