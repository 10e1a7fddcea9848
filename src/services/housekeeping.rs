use crate::domain::conversation::CLEANUP_EVERY;
use crate::services::{conversations::ConversationStore, rate_limit::RateLimiter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::info;

/// Periodically drop drained rate-limit windows and unused conversation slots.
///
/// Conversation expiry itself runs on per-id timers; this only reclaims slots
/// that never stored a turn.
pub fn start_cleanup(conversations: ConversationStore, limiter: Arc<Mutex<RateLimiter>>) {
    tokio::spawn(async move {
        loop {
            sleep(CLEANUP_EVERY).await;
            run_once(&conversations, &limiter).await;
        }
    });
}

pub(crate) async fn run_once(conversations: &ConversationStore, limiter: &Mutex<RateLimiter>) {
    let slots = conversations.sweep_idle().await;
    let clients = limiter.lock().await.sweep();
    if slots > 0 || clients > 0 {
        info!(removed_slots = slots, removed_clients = clients, "housekeeping sweep");
    }
}
