use crate::clients::openai::LlmClient;
use crate::services::chat::ChatGateway;
use crate::services::conversations::ConversationStore;
use crate::services::rate_limit::RateLimiter;
use crate::services::summarizer::SummarizationGateway;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub summarizer: Arc<SummarizationGateway>,
    pub chat: Arc<ChatGateway>,
    pub conversations: ConversationStore,
    pub limiter: Arc<Mutex<RateLimiter>>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>, rate_limit_per_minute: Option<usize>) -> Self {
        let conversations = ConversationStore::new();
        Self {
            summarizer: Arc::new(SummarizationGateway::new(llm.clone())),
            chat: Arc::new(ChatGateway::new(llm, conversations.clone())),
            conversations,
            limiter: Arc::new(Mutex::new(RateLimiter::new(rate_limit_per_minute))),
        }
    }
}
