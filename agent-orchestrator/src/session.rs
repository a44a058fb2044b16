//! Backend session id, cached in the persistent store
//!
//! Once the backend hands out a session id it is attached to every chat and
//! execution request until [`SessionTracker::reset`] is called.

use crate::storage::{KeyValueStore, StorageError, SESSION_ID_KEY};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks the active session id
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The cached session id, if any
    pub fn current(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get(SESSION_ID_KEY)?
            .filter(|id| !id.is_empty()))
    }

    /// Remember a session id returned by the backend
    pub fn capture(&self, session_id: &str) -> Result<(), StorageError> {
        if session_id.is_empty() {
            return Ok(());
        }
        if self.current()?.as_deref() != Some(session_id) {
            info!(session_id, "Session active");
        }
        self.store.set(SESSION_ID_KEY, session_id)
    }

    /// Forget the session so the next request starts a new one
    pub fn reset(&self) -> Result<(), StorageError> {
        debug!("Session reset");
        self.store.remove(SESSION_ID_KEY)
    }
}
