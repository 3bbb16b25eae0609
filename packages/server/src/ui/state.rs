//! Server state shared across handlers.

use tokio::sync::Mutex;

use crate::store::SessionStore;

/// Shared application state.
///
/// The store is created once at server start and lives until shutdown.
/// A single mutex serializes every mutation: each inbound message is
/// processed to completion before the next one, which is what makes the
/// store's unsynchronized internal maps safe.
pub struct AppState {
    pub store: Mutex<SessionStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(SessionStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
