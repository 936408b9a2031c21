//! Shared application state.

use std::sync::{Arc, Mutex, MutexGuard};

use reelbranch_core::gateway::BackendGateway;
use reelbranch_core::time::Clock;
use reelbranch_narrative::application::store::NarrativeStore;
use reelbranch_narrative::domain::prompt::PromptConfig;

use crate::error::ApiError;

/// Application state shared across all request handlers.
///
/// The session lock is only held for synchronous store calls, never across
/// a gateway await.
#[derive(Clone)]
pub struct AppState {
    /// Backend client, shared with the store.
    pub gateway: Arc<dyn BackendGateway>,
    session: Arc<Mutex<NarrativeStore>>,
}

impl AppState {
    /// Create new application state hosting one empty session.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        clock: Arc<dyn Clock>,
        prompt: PromptConfig,
    ) -> Self {
        let store = NarrativeStore::new(Arc::clone(&gateway), clock, prompt);
        Self {
            gateway,
            session: Arc::new(Mutex::new(store)),
        }
    }

    /// Locks the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionPoisoned` if a previous holder panicked.
    pub fn session(&self) -> Result<MutexGuard<'_, NarrativeStore>, ApiError> {
        self.session
            .lock()
            .map_err(|e| ApiError::SessionPoisoned(e.to_string()))
    }
}
