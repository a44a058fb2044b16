//! Persistent key/value storage port
//!
//! Everything the client keeps between runs (session id, preferences, token
//! ledger, transcripts, todo list) is stored as string values under fixed
//! keys. The core logic only sees the [`KeyValueStore`] trait.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Key holding the backend-issued session id
pub const SESSION_ID_KEY: &str = "current_session_id";
/// Key holding the cumulative token usage ledger (JSON)
pub const TOKEN_USAGE_KEY: &str = "token_usage_data";
/// Key holding the todo demo list (JSON)
pub const TODOS_KEY: &str = "todos";

/// Key holding the persisted transcript of one session
pub fn chat_history_key(session_id: &str) -> String {
    format!("chat_history_{}", session_id)
}

/// Errors that can occur when reading or writing the store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// String-valued key/value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value (no-op if absent)
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
