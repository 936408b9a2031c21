//! Shared test doubles and fixtures for the Reelbranch workspace.

mod clock;
mod fixtures;
mod gateway;

pub use clock::FixedClock;
pub use fixtures::{flat_node, minute};
pub use gateway::{FailingGateway, GatewayCall, InMemoryGateway};
