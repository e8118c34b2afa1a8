//! Upstream calling capability: sends the (model-rewritten) request body to
//! a concrete provider and returns either a buffered JSON body or an SSE
//! byte stream.
//!
//! Grounded in `at-intelligence::llm::{LlmProvider, MockProvider}`: same
//! trait-object-for-testability shape, adapted from "complete a classifier
//! prompt" to "forward an OpenAI-compatible chat-completion request and
//! return its raw bytes/stream untouched" — the body is forwarded
//! byte-for-byte, never re-encoded.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
}

pub enum UpstreamBody {
    Buffered(Bytes),
    Stream(Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>),
}

pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Every field the pipeline needs to perform one upstream attempt. Built
/// fresh per fallback-chain attempt.
pub struct UpstreamRequest<'a> {
    pub base_url: &'a str,
    pub api_key: Option<&'a str>,
    pub body: serde_json::Value,
    pub stream: bool,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<UpstreamResponse, UpstreamError>;
}

/// Real upstream caller. Provider-specific wire-format translation (e.g.
/// Anthropic's distinct Messages-API shape) is out of scope for this proxy;
/// every provider is addressed as an OpenAI-compatible
/// `POST {base_url}/v1/chat/completions` endpoint (see DESIGN.md).
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
}

impl ReqwestUpstreamClient {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for ReqwestUpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}/v1/chat/completions", request.base_url);
        let mut builder = self.client.post(url).json(&request.body);
        if let Some(key) = request.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Network(e.to_string())
            }
        })?;

        let status = response.status();

        if request.stream {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| UpstreamError::Network(e.to_string())));
            Ok(UpstreamResponse { status, body: UpstreamBody::Stream(Box::pin(stream)) })
        } else {
            let bytes = response.bytes().await.map_err(|e| UpstreamError::Network(e.to_string()))?;
            Ok(UpstreamResponse { status, body: UpstreamBody::Buffered(bytes) })
        }
    }
}

/// Test double returning pre-queued responses, analogous to the
/// classifier's `MockProvider`.
#[derive(Default)]
pub struct MockUpstream {
    responses: Mutex<VecDeque<Result<(StatusCode, Bytes), UpstreamError>>>,
    pub captured_models: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, status: StatusCode, body: impl Into<Bytes>) -> Self {
        self.responses.lock().unwrap().push_back(Ok((status, body.into())));
        self
    }

    pub fn with_error(self, error: UpstreamError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<UpstreamResponse, UpstreamError> {
        if let Some(model) = request.body.get("model").and_then(|v| v.as_str()) {
            self.captured_models.lock().unwrap().push(model.to_string());
        }
        let mut queue = self.responses.lock().unwrap();
        let (status, bytes) = queue
            .pop_front()
            .unwrap_or(Ok((StatusCode::OK, Bytes::from_static(b"{}"))))?;
        Ok(UpstreamResponse { status, body: UpstreamBody::Buffered(bytes) })
    }
}

/// Maps a catalog provider name to its API base URL.
pub fn provider_base_url(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "https://api.anthropic.com",
        "openai" => "https://api.openai.com",
        "google" => "https://generativelanguage.googleapis.com",
        "deepseek" => "https://api.deepseek.com",
        _ => "https://api.openai.com",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_upstream_returns_queued_responses_in_order() {
        let mock = MockUpstream::new()
            .with_response(StatusCode::SERVICE_UNAVAILABLE, &b"{}"[..])
            .with_response(StatusCode::OK, &br#"{"choices":[]}"#[..]);

        let first = mock
            .send(UpstreamRequest { base_url: "http://x", api_key: None, body: serde_json::json!({"model": "a"}), stream: false })
            .await
            .unwrap();
        assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);

        let second = mock
            .send(UpstreamRequest { base_url: "http://x", api_key: None, body: serde_json::json!({"model": "b"}), stream: false })
            .await
            .unwrap();
        assert_eq!(second.status, StatusCode::OK);

        assert_eq!(*mock.captured_models.lock().unwrap(), vec!["a", "b"]);
    }
}
