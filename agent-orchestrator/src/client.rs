//! Session-aware client over an [`AgentBackend`]
//!
//! Threads the cached session id through chat and execution requests and
//! runs the optional auto-debug pass after a failed execution. Nothing is
//! retried; transport errors propagate to the caller.

use crate::backend::{
    Agent, AgentBackend, ChatRequest, ChatResponse, ClientError, ExecuteRequest, ExecutionResult,
    SessionDetail, SessionList,
};
use crate::session::SessionTracker;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call chat settings
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub mcp_server: String,
    pub auto_process: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.7,
            mcp_server: "anthropic".to_string(),
            auto_process: true,
        }
    }
}

/// Per-call execution settings
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Ask the debugger agent for a fix when execution reports an error
    pub auto_debug: bool,
    pub mcp_server: String,
    pub mode: String,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            auto_debug: true,
            mcp_server: "anthropic".to_string(),
            mode: "script".to_string(),
        }
    }
}

/// Prompt sent to the debugger agent after a failed execution
pub fn debug_prompt(code: &str, language: &str, error: &str) -> String {
    format!(
        "Debug this code and fix all errors: \n```{}\n{}\n```\n\nERROR:\n{}",
        language, code, error
    )
}

/// Client for the agent backend
#[derive(Clone)]
pub struct AgentClient {
    backend: Arc<dyn AgentBackend>,
    session: SessionTracker,
}

impl AgentClient {
    pub fn new(backend: Arc<dyn AgentBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            session: SessionTracker::new(store),
        }
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// Send a message to an agent, attaching and capturing the session id
    pub async fn send_chat_message(
        &self,
        message: &str,
        agent: Agent,
        options: &ChatOptions,
    ) -> Result<ChatResponse, ClientError> {
        let session_id = self.session.current()?;
        debug!(
            agent = %agent,
            mcp_server = %options.mcp_server,
            session = session_id.as_deref().unwrap_or("new"),
            "Sending chat message"
        );

        let request = ChatRequest {
            message: message.to_string(),
            agent,
            auto_process: options.auto_process,
            model: options.model.clone(),
            temperature: options.temperature,
            mcp_server: options.mcp_server.clone(),
            session_id,
        };

        let response = self.backend.chat(&request).await?;

        if let Some(id) = response.session_id.as_deref() {
            self.session.capture(id)?;
        }

        Ok(response)
    }

    /// Run code remotely, optionally asking the debugger agent for a fix
    ///
    /// `session_id` overrides the cached session for this call. The debug
    /// pass never fails the call: a debugger failure is reported in
    /// `debug_error` alongside the original execution result.
    pub async fn execute_code(
        &self,
        code: &str,
        language: &str,
        session_id: Option<&str>,
        options: &ExecuteOptions,
    ) -> Result<ExecutionResult, ClientError> {
        let session_id = match session_id {
            Some(id) => Some(id.to_string()),
            None => self.session.current()?,
        };

        let request = ExecuteRequest {
            code: code.to_string(),
            language: language.to_string(),
            mode: options.mode.clone(),
            session_id,
            auto_debug: options.auto_debug,
            mcp_server: options.mcp_server.clone(),
        };

        info!(language, auto_debug = options.auto_debug, "Executing code");
        let mut result = self.backend.execute_code(&request).await?;

        let error = match result.error() {
            Some(e) if options.auto_debug => e.to_string(),
            _ => return Ok(result),
        };

        info!("Execution reported an error, asking the debugger agent");
        let chat_options = ChatOptions {
            mcp_server: options.mcp_server.clone(),
            ..Default::default()
        };
        match self
            .send_chat_message(&debug_prompt(code, language, &error), Agent::Debugger, &chat_options)
            .await
        {
            Ok(debug) => {
                result.debug_result = debug.response;
            }
            Err(e) => {
                warn!(error = %e, "Auto-debug failed");
                result.debug_error = Some(e.to_string());
            }
        }
        result.was_debug_attempted = true;

        Ok(result)
    }

    /// List the session ids known to the backend
    pub async fn list_sessions(&self) -> Result<SessionList, ClientError> {
        self.backend.list_sessions().await
    }

    /// Fetch one session's transcript
    pub async fn get_session(&self, session_id: &str) -> Result<SessionDetail, ClientError> {
        self.backend.get_session(session_id).await
    }

    /// Forget the cached session id
    pub fn reset_session(&self) -> Result<(), ClientError> {
        Ok(self.session.reset()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::storage::MemoryStore;

    fn client() -> (Arc<FakeBackend>, AgentClient) {
        let backend = Arc::new(FakeBackend::new());
        let client = AgentClient::new(backend.clone(), Arc::new(MemoryStore::new()));
        (backend, client)
    }

    #[tokio::test]
    async fn test_session_id_is_captured_and_attached() {
        let (backend, client) = client();
        backend.push_chat(ChatResponse {
            response: Some("hello".to_string()),
            session_id: Some("abc".to_string()),
            ..Default::default()
        });
        backend.push_chat_text("again", None);

        client
            .send_chat_message("hi", Agent::Executor, &ChatOptions::default())
            .await
            .unwrap();
        client
            .send_chat_message("hi again", Agent::Planner, &ChatOptions::default())
            .await
            .unwrap();

        let requests = backend.chat_requests.lock().unwrap();
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("abc"));
        assert_eq!(requests[1].agent, Agent::Planner);
    }

    #[tokio::test]
    async fn test_reset_stops_attaching_session() {
        let (backend, client) = client();
        client.session().capture("abc").unwrap();
        client.reset_session().unwrap();
        backend.push_chat_text("fresh", None);

        client
            .send_chat_message("hi", Agent::Executor, &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(backend.chat_requests.lock().unwrap()[0].session_id, None);
    }

    #[tokio::test]
    async fn test_chat_failure_propagates() {
        let (backend, client) = client();
        backend.push_chat_failure("HTTP 500 Internal Server Error");
        let err = client
            .send_chat_message("hi", Agent::Executor, &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_execute_uses_explicit_session_over_cached() {
        let (backend, client) = client();
        client.session().capture("cached").unwrap();

        client
            .execute_code("print(1)", "python", Some("explicit"), &ExecuteOptions::default())
            .await
            .unwrap();
        client
            .execute_code("print(1)", "python", None, &ExecuteOptions::default())
            .await
            .unwrap();

        let requests = backend.execute_requests.lock().unwrap();
        assert_eq!(requests[0].session_id.as_deref(), Some("explicit"));
        assert_eq!(requests[1].session_id.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_auto_debug_attaches_debugger_response() {
        let (backend, client) = client();
        backend.push_execution_error("NameError: x");
        backend.push_chat_text("```python\nx = 1\nprint(x)\n```", Some("code"));

        let result = client
            .execute_code("print(x)", "python", None, &ExecuteOptions::default())
            .await
            .unwrap();

        assert!(result.was_debug_attempted);
        assert!(result.debug_suggestion().unwrap().contains("x = 1"));
        let chats = backend.chat_requests.lock().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].agent, Agent::Debugger);
        assert!(chats[0].message.contains("print(x)"));
        assert!(chats[0].message.contains("NameError: x"));
    }

    #[tokio::test]
    async fn test_debugger_failure_is_reported_not_raised() {
        let (backend, client) = client();
        backend.push_execution_error("boom");
        backend.push_chat_failure("HTTP 503 Service Unavailable");

        let result = client
            .execute_code("oops", "python", None, &ExecuteOptions::default())
            .await
            .unwrap();

        assert!(result.was_debug_attempted);
        assert!(result.debug_result.is_none());
        assert!(result.debug_error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_no_debug_when_disabled() {
        let (backend, client) = client();
        backend.push_execution_error("boom");
        let options = ExecuteOptions {
            auto_debug: false,
            ..Default::default()
        };

        let result = client.execute_code("oops", "python", None, &options).await.unwrap();
        assert!(!result.was_debug_attempted);
        assert_eq!(backend.chat_count(), 0);
    }
}
