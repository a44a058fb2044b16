//! Scripted in-process backend for tests

use super::{
    AgentBackend, ChatRequest, ChatResponse, ClientError, ExecuteRequest, ExecutionResult,
    SessionDetail, SessionList,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses and records every request it receives
#[derive(Default)]
pub struct FakeBackend {
    chat_replies: Mutex<VecDeque<Result<ChatResponse, String>>>,
    execute_replies: Mutex<VecDeque<Result<ExecutionResult, String>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub execute_requests: Mutex<Vec<ExecuteRequest>>,
    pub sessions: Mutex<SessionList>,
    pub session_detail: Mutex<SessionDetail>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chat(&self, response: ChatResponse) {
        self.chat_replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_chat_text(&self, text: &str, response_type: Option<&str>) {
        self.push_chat(ChatResponse {
            response: Some(text.to_string()),
            response_type: response_type.map(str::to_string),
            ..Default::default()
        });
    }

    pub fn push_chat_failure(&self, message: &str) {
        self.chat_replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn push_execution(&self, result: ExecutionResult) {
        self.execute_replies.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_execution_error(&self, error: &str) {
        self.push_execution(ExecutionResult {
            error: Some(error.to_string()),
            status: Some("error".to_string()),
            ..Default::default()
        });
    }

    pub fn push_execution_failure(&self, message: &str) {
        self.execute_replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn chat_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }

    pub fn execute_count(&self) -> usize {
        self.execute_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentBackend for FakeBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        match self.chat_replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ClientError::ApiError(message)),
            None => Err(ClientError::ApiError("no scripted chat reply".to_string())),
        }
    }

    async fn execute_code(&self, request: &ExecuteRequest) -> Result<ExecutionResult, ClientError> {
        self.execute_requests.lock().unwrap().push(request.clone());
        match self.execute_replies.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(ClientError::ApiError(message)),
            None => Ok(ExecutionResult {
                output: Some(String::new()),
                status: Some("success".to_string()),
                ..Default::default()
            }),
        }
    }

    async fn list_sessions(&self) -> Result<SessionList, ClientError> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn get_session(&self, _session_id: &str) -> Result<SessionDetail, ClientError> {
        Ok(self.session_detail.lock().unwrap().clone())
    }
}
