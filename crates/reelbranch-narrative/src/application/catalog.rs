//! Story list resolution for list views.

use reelbranch_core::error::NarrativeError;
use reelbranch_core::gateway::{BackendGateway, StorySummary};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::domain::tree::build_tree;

/// A known story plus the still list views show for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryListing {
    /// Backend summary.
    pub summary: StorySummary,
    /// Root thumbnail, absent when it could not be resolved.
    pub thumbnail_ref: Option<String>,
}

/// Lists stories and resolves each story's thumbnail through the same tree
/// construction the session uses.
///
/// A story whose tree cannot be fetched or built is still listed, without a
/// thumbnail.
///
/// # Errors
///
/// Returns the gateway error if the story list itself cannot be fetched.
#[instrument(skip(gateway))]
pub async fn fetch_listings(
    gateway: &dyn BackendGateway,
) -> Result<Vec<StoryListing>, NarrativeError> {
    let summaries = gateway.list_stories().await?;
    let mut listings = Vec::with_capacity(summaries.len());

    for summary in summaries {
        let thumbnail_ref = match gateway.fetch_tree(summary.story_id).await {
            Ok(fetched) => {
                match build_tree(summary.story_id, fetched.root_node_id, &fetched.nodes) {
                    Ok(tree) => tree.thumbnail_ref().map(str::to_owned),
                    Err(e) => {
                        warn!(story_id = %summary.story_id, error = %e, "thumbnail tree malformed");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(story_id = %summary.story_id, error = %e, "thumbnail tree fetch failed");
                None
            }
        };
        listings.push(StoryListing {
            summary,
            thumbnail_ref,
        });
    }

    Ok(listings)
}
