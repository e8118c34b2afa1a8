//! Minimal LLM provider abstraction used solely by the LLM Classifier
//! for its one-shot fallback completion call.
//!
//! Grounded in `at-intelligence::llm::LlmProvider`/`AnthropicProvider`/
//! `OpenAiProvider`/`MockProvider`, trimmed to the `complete`-only surface
//! this crate needs (classification never streams).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCompletionResponse {
    pub content: String,
}

/// One-shot completion capability. Kept trait-object-friendly
/// (`Arc<dyn LlmProvider>`) so `LlmClassifier` can be unit-tested with a
/// `MockProvider` instead of a real network call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &LlmCompletionRequest) -> Result<LlmCompletionResponse, LlmError>;
}

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: &LlmCompletionRequest) -> Result<LlmCompletionResponse, LlmError> {
        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message: text });
        }

        let parsed: AnthropicResponse = resp.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        let content = parsed
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmCompletionResponse { content })
    }
}

/// OpenAI Chat Completions API provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &LlmCompletionRequest) -> Result<LlmCompletionResponse, LlmError> {
        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message: text });
        }

        let parsed: OpenAiResponse = resp.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(LlmCompletionResponse { content })
    }
}

/// Test double: returns queued responses in order, or a default when the
/// queue is empty.
pub struct MockProvider {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<LlmCompletionResponse, LlmError>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmCompletionResponse { content: content.into() }));
        self
    }

    pub fn with_error(self, error: LlmError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, _request: &LlmCompletionRequest) -> Result<LlmCompletionResponse, LlmError> {
        let mut queue = self.responses.lock().unwrap();
        queue
            .pop_front()
            .unwrap_or(Ok(LlmCompletionResponse { content: "MEDIUM".to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_returns_queued_response_in_order() {
        let provider = MockProvider::new().with_response("SIMPLE").with_response("COMPLEX");
        let req = LlmCompletionRequest {
            model: "test".into(),
            prompt: "classify this".into(),
            max_tokens: 10,
            temperature: 0.0,
        };
        assert_eq!(provider.complete(&req).await.unwrap().content, "SIMPLE");
        assert_eq!(provider.complete(&req).await.unwrap().content, "COMPLEX");
    }

    #[tokio::test]
    async fn mock_provider_defaults_to_medium_when_empty() {
        let provider = MockProvider::new();
        let req = LlmCompletionRequest {
            model: "test".into(),
            prompt: "classify this".into(),
            max_tokens: 10,
            temperature: 0.0,
        };
        assert_eq!(provider.complete(&req).await.unwrap().content, "MEDIUM");
    }
}
