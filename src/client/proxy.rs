use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::summary::{is_too_short, truncate_for_provider};
use crate::error::SummaryError;
use crate::services::summarizer::Summarizer;
use crate::web::handlers::SummarizeResponse;

/// Summarizer that goes through the proxy server's `POST /summarize`.
#[derive(Clone)]
pub struct ProxySummarizer {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

impl ProxySummarizer {
    pub fn new(base_url: &str) -> Self {
        Self { http: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl Summarizer for ProxySummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        if is_too_short(text) {
            return Err(SummaryError::InputTooShort);
        }
        let text = truncate_for_provider(text);
        debug!(chars = text.len(), "requesting summary from proxy");

        let resp = self
            .http
            .post(format!("{}/summarize", self.base_url))
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| SummaryError::ProviderUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.details.unwrap_or(body.error),
                Err(_) => status.to_string(),
            };
            warn!(status = status.as_u16(), %message, "proxy rejected summary request");
            return Err(SummaryError::ProviderError { status: status.as_u16(), message });
        }

        let body: SummarizeResponse = resp
            .json()
            .await
            .map_err(|e| SummaryError::ProviderUnavailable(format!("malformed proxy response: {e}")))?;
        Ok(body.summary)
    }
}
