use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Outcome of a failed summarization or chat turn.
///
/// Gateways never panic or bubble transport errors across their interface;
/// callers get one of these and branch on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("text too short for summarization")]
    InputTooShort,
    #[error("page content could not be extracted: {0}")]
    ExtractionFailed(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("provider returned status {status}: {message}")]
    ProviderError { status: u16, message: String },
    #[error("page changed before the summary arrived")]
    Stale,
}

impl SummaryError {
    /// Provider status code, when the provider produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SummaryError::ProviderError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Local cache failures. Logged by the cache and never surfaced to callers.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file is corrupt: {0}")]
    ReadCorrupt(#[from] serde_json::Error),
    #[error("cache read failed: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("cache write failed: {0}")]
    WriteFailed(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("summarization failed: {0}")]
    Summarization(SummaryError),
    #[error("chat failed: {0}")]
    Chat(SummaryError),
    #[error("too many requests")]
    RateLimited,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<SummaryError> for AppError {
    fn from(e: SummaryError) -> Self {
        match e {
            SummaryError::InputTooShort => AppError::BadRequest("Text too short for summarization".into()),
            other => AppError::Summarization(other),
        }
    }
}

/// Malformed or mistyped JSON bodies are the caller's fault, same as short text.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
            AppError::Summarization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Summarization failed", "details": e.to_string() }),
            ),
            AppError::Chat(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Chat failed", "details": e.to_string() }),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Too many requests, retry shortly" }),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal error" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
