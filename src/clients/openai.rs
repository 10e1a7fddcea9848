//! Chat-completions client for the remote model provider.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. In dev mode the
//! [`MockClient`] stands in and never touches the network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SummaryError;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 250;

pub const MOCK_SUMMARY: &str = "This is a mock summary for development. First paragraph with key points. Second paragraph with supporting details.";
pub const MOCK_CHAT: &str = "Mock response: dev mode answers without calling the provider.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self { Self { role: Role::System, content: content.into() } }
    pub fn user(content: impl Into<String>) -> Self { Self { role: Role::User, content: content.into() } }
    pub fn assistant(content: impl Into<String>) -> Self { Self { role: Role::Assistant, content: content.into() } }
}

/// What a completion is for. Only the mock provider cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Summary,
    Chat,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, kind: CompletionKind, messages: &[ChatMessage]) -> Result<String, SummaryError>;
}

/// Build the provider selected by config: the mock in dev mode, otherwise the HTTP client.
pub fn from_config(cfg: &Config) -> std::sync::Arc<dyn LlmClient> {
    if cfg.dev_mode {
        tracing::info!("dev mode: using mock provider");
        return std::sync::Arc::new(MockClient);
    }
    std::sync::Arc::new(OpenAiClient::new(
        cfg.api_key.clone().unwrap_or_default(),
        &cfg.api_base,
        &cfg.model,
    ))
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_base: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, kind: CompletionKind, messages: &[ChatMessage]) -> Result<String, SummaryError> {
        debug!(?kind, model = %self.model, messages = messages.len(), "calling provider");
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummaryError::ProviderUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), error = %message, "provider returned an error");
            return Err(SummaryError::ProviderError { status: status.as_u16(), message });
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| SummaryError::ProviderUnavailable(format!("malformed provider response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummaryError::ProviderUnavailable("provider returned no choices".into()))
    }
}

/// Deterministic provider for dev mode and tests.
#[derive(Clone, Copy, Default)]
pub struct MockClient;

#[async_trait]
impl LlmClient for MockClient {
    async fn complete(&self, kind: CompletionKind, _messages: &[ChatMessage]) -> Result<String, SummaryError> {
        debug!(?kind, "dev mode: returning mock response");
        Ok(match kind {
            CompletionKind::Summary => MOCK_SUMMARY.to_string(),
            CompletionKind::Chat => MOCK_CHAT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let v = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(v["role"], "assistant");
        assert_eq!(v["content"], "hi");
    }

    #[tokio::test]
    async fn mock_answers_by_kind() {
        let m = MockClient;
        assert_eq!(m.complete(CompletionKind::Summary, &[]).await.unwrap(), MOCK_SUMMARY);
        assert_eq!(m.complete(CompletionKind::Chat, &[]).await.unwrap(), MOCK_CHAT);
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let client = OpenAiClient::new("key".into(), "http://127.0.0.1:1/v1/", "m");
        let err = client.complete(CompletionKind::Chat, &[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, SummaryError::ProviderUnavailable(_)));
    }
}
