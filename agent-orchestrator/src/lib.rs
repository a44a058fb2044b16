//! agentflow - client and workflow driver for a multi-agent LLM backend
//!
//! This crate provides:
//! - Extraction of HTML/CSS/JS code blocks from free-form LLM responses
//! - Heuristic source language detection
//! - Assembly of extracted fragments into one self-contained HTML document
//! - The generate -> execute -> debug -> re-execute workflow over HTTP
//! - Client-side persisted state: session id, preferences, token ledger,
//!   transcripts and the todo demo list
//! - A one-route static file server for the todo demo

pub mod assemble;
pub mod attachments;
pub mod backend;
pub mod chat;
pub mod client;
pub mod extract;
pub mod language;
pub mod preferences;
pub mod server;
pub mod session;
pub mod storage;
pub mod todo;
pub mod transcript;
pub mod usage;
pub mod workflow;

pub use backend::{AgentBackend, HttpBackend};
pub use client::AgentClient;
pub use extract::{extract_code_blocks, CodeBundle};
pub use language::{detect_language, Language};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use workflow::{Phase, WorkflowOptions, WorkflowOutcome, WorkflowRunner};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the client and the demo server
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the agent backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP timeout for backend calls (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// File backing the persistent key/value store
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Todo demo server settings
    #[serde(default)]
    pub todo: TodoServerConfig,
}

fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_timeout_secs() -> u64 { 300 }
fn default_state_path() -> PathBuf { PathBuf::from(".agentflow/state.json") }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            state_path: default_state_path(),
            todo: TodoServerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }
}

/// Configuration for the todo demo server
#[derive(Debug, Clone, Deserialize)]
pub struct TodoServerConfig {
    /// Port to listen on
    #[serde(default = "default_todo_port")]
    pub port: u16,

    /// Directory holding index.html and the other static assets
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_todo_port() -> u16 { 3000 }
fn default_static_dir() -> PathBuf { PathBuf::from("demos/todo-app") }

impl Default for TodoServerConfig {
    fn default() -> Self {
        Self {
            port: default_todo_port(),
            static_dir: default_static_dir(),
        }
    }
}
