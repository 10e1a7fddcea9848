use axum::{routing::{get, post}, Router};
use tower_http::cors::{Any, CorsLayer};
use crate::state::AppState;
use super::handlers::{chat, health, summarize};

pub fn build_router(state: AppState) -> Router {
    // Page scripts call in from arbitrary origins.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize))
        .route("/chat", post(chat))
        .layer(cors)
        .with_state(state)
}
