//! HTTP transport for the agent backend

use super::{
    AgentBackend, ChatRequest, ChatResponse, ClientError, ExecuteRequest, ExecutionResult,
    SessionDetail, SessionList,
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backend reached over JSON/HTTP
pub struct HttpBackend {
    client: Client,
    base_url: String,
    base: Url,
}

impl HttpBackend {
    /// Create a backend client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let start = Instant::now();

        let response = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let parsed = Self::parse(response).await?;
        debug!(url = %url, elapsed_ms = start.elapsed().as_millis() as u64, "POST completed");
        Ok(parsed)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let response = self.client.get(url.clone()).send().await?;
        let parsed = Self::parse(response).await?;
        debug!(url = %url, "GET completed");
        Ok(parsed)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError(if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, body.trim())
            }));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AgentBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.post_json(&["chat"], request).await
    }

    async fn execute_code(&self, request: &ExecuteRequest) -> Result<ExecutionResult, ClientError> {
        self.post_json(&["execute-code"], request).await
    }

    async fn list_sessions(&self) -> Result<SessionList, ClientError> {
        self.get_json(&["sessions"]).await
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionDetail, ClientError> {
        self.get_json(&["session", session_id]).await
    }
}
