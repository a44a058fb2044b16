//! Remote agent backend: wire types and transport abstraction
//!
//! The backend exposes four endpoints (`/chat`, `/execute-code`,
//! `/sessions`, `/session/{id}`). [`AgentBackend`] is the seam between the
//! workflow logic and the transport so the logic can be driven by an
//! in-process fake in tests.

mod http;
#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpBackend;

use crate::storage::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("A request is already in flight")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Role label selecting prompt handling on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    Executor,
    Code,
    Planner,
    Data,
    Debugger,
}

impl Agent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Executor => "executor",
            Agent::Code => "code",
            Agent::Planner => "planner",
            Agent::Data => "data",
            Agent::Debugger => "debugger",
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Agent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "executor" => Ok(Agent::Executor),
            "code" => Ok(Agent::Code),
            "planner" => Ok(Agent::Planner),
            "data" => Ok(Agent::Data),
            "debugger" => Ok(Agent::Debugger),
            other => Err(format!("unknown agent: {}", other)),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub agent: Agent,
    pub auto_process: bool,
    pub model: String,
    pub temperature: f32,
    pub mcp_server: String,
    /// Sent as `null` when no session is active yet
    pub session_id: Option<String>,
}

/// Token counts reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Response of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub selected_model: Option<String>,
    #[serde(default)]
    pub selected_temperature: Option<f32>,
    /// Declared response kind, e.g. `"code"` or `"text"`
    #[serde(default, rename = "type")]
    pub response_type: Option<String>,
}

impl ChatResponse {
    /// Response text, `None` when missing or empty
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.is_empty())
    }

    /// True when the backend declared a kind other than code
    pub fn is_non_code(&self) -> bool {
        matches!(self.response_type.as_deref(), Some(t) if !t.is_empty() && t != "code")
    }
}

/// Body of `POST /execute-code`
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest {
    pub code: String,
    pub language: String,
    pub mode: String,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub auto_debug: bool,
    pub mcp_server: String,
}

/// Response of `POST /execute-code`, plus the client-side debug attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Debugger agent's response text, filled in by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_result: Option<String>,
    #[serde(default)]
    pub was_debug_attempted: bool,
    /// Failure of the debugger call itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_error: Option<String>,
}

impl ExecutionResult {
    /// Execution error, `None` when missing or empty
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|s| !s.is_empty())
    }

    /// Debug suggestion, `None` when missing or empty
    pub fn debug_suggestion(&self) -> Option<&str> {
        self.debug_result.as_deref().filter(|s| !s.is_empty())
    }
}

/// Response of `GET /sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

/// One listed session: either a bare id or the backend's summary record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionEntry {
    Id(String),
    Summary(SessionSummary),
}

impl SessionEntry {
    pub fn id(&self) -> &str {
        match self {
            SessionEntry::Id(id) => id,
            SessionEntry::Summary(summary) => &summary.session_id,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            SessionEntry::Id(_) => None,
            SessionEntry::Summary(summary) => summary.summary.as_deref().filter(|s| !s.is_empty()),
        }
    }
}

/// Session metadata as listed by the backend's memory manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub agents_used: Vec<String>,
    #[serde(default)]
    pub message_count: Option<u64>,
}

/// One exchange in a stored session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub message: String,
    /// Stored either as plain text or as the full chat response object
    #[serde(default, deserialize_with = "response_text")]
    pub response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn response_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(Value::Object(map)) => map
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(other) => other.to_string(),
    })
}

/// Response of `GET /session/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "messages")]
    pub history: Vec<HistoryEntry>,
}

/// Transport to the agent backend
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Send a message to an agent
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// Run code remotely
    async fn execute_code(&self, request: &ExecuteRequest) -> Result<ExecutionResult, ClientError>;

    /// List known session ids
    async fn list_sessions(&self) -> Result<SessionList, ClientError>;

    /// Fetch one session's transcript
    async fn get_session(&self, session_id: &str) -> Result<SessionDetail, ClientError>;
}
