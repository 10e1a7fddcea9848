use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{AppError, Result};
use crate::services::summarizer::Summarizer;
use crate::state::AppState;

pub const CONVERSATION_HEADER: &str = "x-conversation-id";

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
}

pub async fn health() -> &'static str { "ok" }

/// POST /summarize
pub async fn summarize(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>> {
    check_rate(&state, &peer).await?;
    let Json(body) = payload?;
    let text = body.text.unwrap_or_default();
    match state.summarizer.summarize(&text).await {
        Ok(summary) => Ok(Json(SummarizeResponse { summary })),
        Err(e) => {
            tracing::error!(%peer, error = %e, "summarization failed");
            Err(e.into())
        }
    }
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    check_rate(&state, &peer).await?;
    let Json(body) = payload?;
    let requested = headers.get(CONVERSATION_HEADER).and_then(|v| v.to_str().ok());
    let reply = state
        .chat
        .ask(&body.question, &body.context, requested)
        .await
        .map_err(|e| {
            tracing::error!(%peer, error = %e, "chat failed");
            AppError::Chat(e)
        })?;
    Ok(Json(ChatResponse { response: reply.response, conversation_id: reply.conversation_id }))
}

async fn check_rate(state: &AppState, peer: &SocketAddr) -> Result<()> {
    let mut limiter = state.limiter.lock().await;
    if limiter.hit_ok(&peer.ip().to_string()) {
        Ok(())
    } else {
        tracing::warn!(%peer, "rate limited");
        Err(AppError::RateLimited)
    }
}
