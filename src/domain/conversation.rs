use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CONVERSATION_TTL: Duration = Duration::from_secs(30 * 60);
pub const MAX_CONTEXT_TURNS: usize = 2;
pub const CLEANUP_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }
}
