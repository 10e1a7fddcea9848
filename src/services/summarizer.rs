use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::clients::openai::{ChatMessage, CompletionKind, LlmClient};
use crate::domain::summary::{is_too_short, truncate_for_provider};
use crate::error::SummaryError;

const SUMMARY_INSTRUCTIONS: &str = "You are an efficient summarizer. Write concise, informative summaries that capture the main points. \
Wrap key phrases, important concepts and critical findings in <mark> tags, for example: \
\"The study found that <mark>remote work increased productivity</mark>.\" \
Highlight sparingly, at most 3-4 items per paragraph.";

/// Anything that turns page text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Server-side gateway in front of the model provider.
#[derive(Clone)]
pub struct SummarizationGateway {
    llm: Arc<dyn LlmClient>,
}

impl SummarizationGateway {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

pub(crate) fn summary_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_INSTRUCTIONS),
        ChatMessage::user(format!("Please summarize this text in 1-2 short paragraphs:\n\n{text}")),
    ]
}

#[async_trait]
impl Summarizer for SummarizationGateway {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        if is_too_short(text) {
            return Err(SummaryError::InputTooShort);
        }
        let text = truncate_for_provider(text);
        let summary = self.llm.complete(CompletionKind::Summary, &summary_messages(text)).await?;
        info!(input_chars = text.len(), summary_chars = summary.len(), "summary fetched");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmClient for Recording {
        async fn complete(&self, _kind: CompletionKind, messages: &[ChatMessage]) -> Result<String, SummaryError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok("summary".into())
        }
    }

    struct Failing;

    #[async_trait]
    impl LlmClient for Failing {
        async fn complete(&self, _kind: CompletionKind, _messages: &[ChatMessage]) -> Result<String, SummaryError> {
            Err(SummaryError::ProviderError { status: 503, message: "overloaded".into() })
        }
    }

    #[tokio::test]
    async fn short_inputs_never_reach_provider() {
        let llm = Arc::new(Recording::default());
        let gw = SummarizationGateway::new(llm.clone());
        assert_eq!(gw.summarize("").await, Err(SummaryError::InputTooShort));
        assert_eq!(gw.summarize("short").await, Err(SummaryError::InputTooShort));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_input_is_truncated_before_sending() {
        let llm = Arc::new(Recording::default());
        let gw = SummarizationGateway::new(llm.clone());
        let text = "Sentence number one is here. ".repeat(400);
        assert_eq!(gw.summarize(&text).await.unwrap(), "summary");

        let calls = llm.calls.lock().unwrap();
        let prompt = &calls[0][1].content;
        let sent = prompt.split("\n\n").nth(1).unwrap();
        assert!(sent.len() <= crate::domain::summary::MAX_INPUT_CHARS);
        assert!(sent.ends_with('.'));
    }

    #[tokio::test]
    async fn provider_status_is_carried() {
        let gw = SummarizationGateway::new(Arc::new(Failing));
        let err = gw.summarize(&"word ".repeat(50)).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }
}
