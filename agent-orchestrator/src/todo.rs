//! Todo list for the demo page
//!
//! Records are stored as a JSON array under the `todos` key, in the same
//! `{id, text, completed}` shape the demo page uses.

use crate::storage::{KeyValueStore, StorageError, TODOS_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Creation time in milliseconds since the epoch, unique within a list
    pub id: i64,
    pub text: String,
    pub completed: bool,
}

/// View selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(format!("unknown filter: {}", other)),
        }
    }
}

/// Persistent todo list
pub struct TodoList {
    store: Arc<dyn KeyValueStore>,
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let items = match store.get(TODOS_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(Self { store, items })
    }

    fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.items)?;
        self.store.set(TODOS_KEY, &json)
    }

    /// Add a task; blank text is ignored
    pub fn add(&mut self, text: &str) -> Result<Option<&TodoItem>, StorageError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let mut id = chrono::Utc::now().timestamp_millis();
        if let Some(max) = self.items.iter().map(|t| t.id).max() {
            id = id.max(max + 1);
        }

        self.items.push(TodoItem {
            id,
            text: text.to_string(),
            completed: false,
        });
        self.save()?;
        Ok(self.items.last())
    }

    /// Flip a task's completed flag; returns false if no such task
    pub fn toggle(&mut self, id: i64) -> Result<bool, StorageError> {
        let Some(item) = self.items.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        item.completed = !item.completed;
        self.save()?;
        Ok(true)
    }

    /// Delete a task; returns false if no such task
    pub fn delete(&mut self, id: i64) -> Result<bool, StorageError> {
        let before = self.items.len();
        self.items.retain(|t| t.id != id);
        if self.items.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Remove every completed task; returns how many were removed
    pub fn clear_completed(&mut self) -> Result<usize, StorageError> {
        let before = self.items.len();
        self.items.retain(|t| !t.completed);
        self.save()?;
        Ok(before - self.items.len())
    }

    pub fn filtered(&self, filter: Filter) -> Vec<&TodoItem> {
        self.items
            .iter()
            .filter(|t| match filter {
                Filter::All => true,
                Filter::Active => !t.completed,
                Filter::Completed => t.completed,
            })
            .collect()
    }

    /// Number of tasks not yet completed
    pub fn items_left(&self) -> usize {
        self.items.iter().filter(|t| !t.completed).count()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }
}
