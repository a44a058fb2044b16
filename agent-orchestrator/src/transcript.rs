//! In-memory chat transcript
//!
//! Messages are appended in order and never edited. The transcript can be
//! persisted under `chat_history_{session_id}` and is dropped on reset.

use crate::backend::Agent;
use crate::storage::{chat_history_key, KeyValueStore, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Agent that produced an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
}

/// Ordered list of chat messages
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: &str) -> &ChatMessage {
        self.push(ChatMessage {
            role: Role::User,
            text: text.to_string(),
            timestamp: Utc::now(),
            agent: None,
        })
    }

    pub fn push_assistant(&mut self, text: &str, agent: Agent) -> &ChatMessage {
        self.push(ChatMessage {
            role: Role::Assistant,
            text: text.to_string(),
            timestamp: Utc::now(),
            agent: Some(agent),
        })
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Store the transcript under the session's history key
    pub fn save(&self, store: &dyn KeyValueStore, session_id: &str) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.messages)?;
        store.set(&chat_history_key(session_id), &json)
    }

    /// Load a previously saved transcript; an absent key is an empty one
    pub fn load(store: &dyn KeyValueStore, session_id: &str) -> Result<Self, StorageError> {
        let messages = match store.get(&chat_history_key(session_id))? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(Self { messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_messages_keep_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.push_assistant("hello", Agent::Executor);
        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(transcript.messages()[1].agent, Some(Agent::Executor));
        assert!(transcript.messages()[0].timestamp <= transcript.messages()[1].timestamp);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut transcript = Transcript::new();
        transcript.push_user("question");
        transcript.push_assistant("answer", Agent::Data);
        transcript.save(&store, "s1").unwrap();

        assert!(store.get("chat_history_s1").unwrap().is_some());
        let loaded = Transcript::load(&store, "s1").unwrap();
        assert_eq!(loaded.messages(), transcript.messages());
        assert!(Transcript::load(&store, "other").unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::new();
        transcript.push_user("x");
        transcript.clear();
        assert_eq!(transcript.len(), 0);
    }
}
