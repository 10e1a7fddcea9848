use std::sync::Arc;
use tracing::info;

use crate::clients::openai::{ChatMessage, CompletionKind, LlmClient};
use crate::domain::conversation::Turn;
use crate::error::SummaryError;
use crate::services::conversations::ConversationStore;

const CHAT_INSTRUCTIONS: &str = "You are a knowledgeable assistant. Answer questions directly and accurately, \
using the article context and general knowledge where needed. Keep responses concise and informative.";
const CONTEXT_ACK: &str = "I'll keep the context in mind. What would you like to know?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
}

/// Prompt for one turn. The page context is only sent while the history is empty.
pub fn build_prompt(context: &str, history: &[Turn], question: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(CHAT_INSTRUCTIONS)];
    if history.is_empty() {
        messages.push(ChatMessage::user(format!(
            "Context: {context}\nRemember this context for our conversation."
        )));
        messages.push(ChatMessage::assistant(CONTEXT_ACK));
    }
    for turn in history {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }
    messages.push(ChatMessage::user(question));
    messages
}

#[derive(Clone)]
pub struct ChatGateway {
    llm: Arc<dyn LlmClient>,
    conversations: ConversationStore,
}

impl ChatGateway {
    pub fn new(llm: Arc<dyn LlmClient>, conversations: ConversationStore) -> Self {
        Self { llm, conversations }
    }

    pub fn conversations(&self) -> &ConversationStore { &self.conversations }

    /// Answer `question` within conversation `id`, allocating an id when none is given.
    ///
    /// The conversation stays locked from reading its history until the answer is
    /// stored, so turns on one id run one at a time.
    pub async fn ask(&self, question: &str, context: &str, id: Option<&str>) -> Result<ChatReply, SummaryError> {
        let conversation_id = self.conversations.get_or_create_id(id);
        let mut conv = self.conversations.checkout(&conversation_id).await;
        let history = conv.context();
        let messages = build_prompt(context, &history, question);

        let answer = self.llm.complete(CompletionKind::Chat, &messages).await?;
        conv.append_turn(question, &answer);
        info!(%conversation_id, prior_turns = history.len(), "chat answer fetched");
        Ok(ChatReply { response: answer, conversation_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmClient for Recording {
        async fn complete(&self, _kind: CompletionKind, messages: &[ChatMessage]) -> Result<String, SummaryError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(messages.to_vec());
            Ok(format!("answer {}", prompts.len()))
        }
    }

    fn mentions(prompt: &[ChatMessage], needle: &str) -> bool {
        prompt.iter().any(|m| m.content.contains(needle))
    }

    #[tokio::test]
    async fn context_is_sent_once_per_conversation() {
        let llm = Arc::new(Recording::default());
        let chat = ChatGateway::new(llm.clone(), ConversationStore::new());

        let first = chat.ask("What is it about?", "ARTICLE-BODY", None).await.unwrap();
        let second = chat.ask("And then?", "ARTICLE-BODY", Some(&first.conversation_id)).await.unwrap();
        assert_eq!(second.conversation_id, first.conversation_id);

        let prompts = llm.prompts.lock().unwrap();
        assert!(mentions(&prompts[0], "ARTICLE-BODY"));
        assert!(!mentions(&prompts[1], "ARTICLE-BODY"));
        assert!(mentions(&prompts[1], "What is it about?"));
        assert!(mentions(&prompts[1], "answer 1"));
    }

    #[tokio::test]
    async fn prompt_size_is_bounded() {
        let llm = Arc::new(Recording::default());
        let chat = ChatGateway::new(llm.clone(), ConversationStore::new());
        for i in 0..6 {
            chat.ask(&format!("q{i}"), "ctx", Some("long")).await.unwrap();
        }
        let prompts = llm.prompts.lock().unwrap();
        // system + 2 prior turns + question
        assert_eq!(prompts.last().unwrap().len(), 1 + 2 * 2 + 1);
    }

    #[test]
    fn first_turn_prompt_shape() {
        let prompt = build_prompt("page text", &[], "why?");
        let roles: Vec<_> = prompt.iter().map(|m| m.role).collect();
        use crate::clients::openai::Role::*;
        assert_eq!(roles, vec![System, User, Assistant, User]);
        assert_eq!(prompt.last().unwrap().content, "why?");
    }

    #[tokio::test]
    async fn failed_turn_stores_nothing() {
        struct Down;
        #[async_trait]
        impl LlmClient for Down {
            async fn complete(&self, _k: CompletionKind, _m: &[ChatMessage]) -> Result<String, SummaryError> {
                Err(SummaryError::ProviderUnavailable("connection refused".into()))
            }
        }
        let store = ConversationStore::new();
        let chat = ChatGateway::new(Arc::new(Down), store.clone());
        let err = chat.ask("q", "ctx", Some("c1")).await.unwrap_err();
        assert!(matches!(err, SummaryError::ProviderUnavailable(_)));
        assert!(store.get_context("c1").await.is_empty());
    }
}
