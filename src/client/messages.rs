//! Message contract between the page UI and the summarizer core.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SummaryError;
use crate::services::summarizer::Summarizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientRequest {
    /// Summarize a page or a user selection.
    SummarizePage { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientResponse {
    Summary { summary: String },
    Error { error: String },
}

/// What the UI shows for a failure. Never includes provider details.
pub fn user_message(err: &SummaryError) -> &'static str {
    match err {
        SummaryError::InputTooShort => "Not enough text to summarize.",
        SummaryError::ExtractionFailed(_) => "Error processing page content.",
        SummaryError::Stale => "The page changed before the summary was ready.",
        SummaryError::ProviderUnavailable(_) | SummaryError::ProviderError { .. } => {
            "Failed to summarize the page."
        }
    }
}

pub async fn handle(summarizer: &dyn Summarizer, request: ClientRequest) -> ClientResponse {
    match request {
        ClientRequest::SummarizePage { text } => match summarizer.summarize(&text).await {
            Ok(summary) => ClientResponse::Summary { summary },
            Err(e) => {
                warn!(error = %e, "summarizePage failed");
                ClientResponse::Error { error: user_message(&e).to_string() }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Summarizer for Echo {
        async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
            if text.starts_with("fail") {
                return Err(SummaryError::ProviderError { status: 500, message: "secret upstream detail".into() });
            }
            Ok(format!("summary of {} chars", text.len()))
        }
    }

    #[test]
    fn request_wire_format() {
        let req: ClientRequest = serde_json::from_str(r#"{"action":"summarizePage","text":"hello"}"#).unwrap();
        assert_eq!(req, ClientRequest::SummarizePage { text: "hello".into() });
    }

    #[tokio::test]
    async fn success_carries_summary() {
        let resp = handle(&Echo, ClientRequest::SummarizePage { text: "abc".into() }).await;
        assert_eq!(serde_json::to_value(&resp).unwrap(), serde_json::json!({ "summary": "summary of 3 chars" }));
    }

    #[tokio::test]
    async fn failure_does_not_leak_details() {
        let resp = handle(&Echo, ClientRequest::SummarizePage { text: "fail now".into() }).await;
        let ClientResponse::Error { error } = resp else { panic!("expected error") };
        assert!(!error.contains("secret"));
        assert_eq!(error, "Failed to summarize the page.");
    }
}
