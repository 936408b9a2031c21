//! Node and timestamp fixtures.

use chrono::{Duration, TimeZone, Utc};
use reelbranch_core::gateway::FlatNode;
use reelbranch_core::time::Timestamp;
use uuid::Uuid;

/// `2026-01-15T10:00:00Z` plus `offset` minutes.
///
/// # Panics
///
/// Never in practice: the base instant is a valid calendar date.
#[must_use]
pub fn minute(offset: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap() + Duration::minutes(offset)
}

/// A backend node with placeholder narration. Non-root nodes carry a
/// decision text derived from their id.
#[must_use]
pub fn flat_node(
    id: Uuid,
    parent_id: Option<Uuid>,
    children: &[Uuid],
    created_at: Timestamp,
) -> FlatNode {
    FlatNode {
        id,
        parent_id,
        children: children.to_vec(),
        content: format!("beat {id}"),
        video_ref: None,
        thumbnail_ref: None,
        decision: parent_id.map(|_| format!("choose {id}")),
        suggested_decisions: Vec::new(),
        created_at,
    }
}
