pub mod clients { pub mod openai; }
pub mod config;
pub mod telemetry;
pub mod state;
pub mod error;
pub mod domain { pub mod conversation; pub mod summary; }
pub mod services { pub mod chat; pub mod conversations; pub mod housekeeping; pub mod rate_limit; pub mod summarizer; }
pub mod web { pub mod router; pub mod handlers; }
pub mod client { pub mod content_gate; pub mod messages; pub mod page; pub mod prefetch; pub mod proxy; pub mod summary_cache; }

use crate::services::housekeeping;
use crate::state::AppState;

pub fn build_app(cfg: crate::config::Config) -> (axum::Router, u16) {
    let llm = crate::clients::openai::from_config(&cfg);
    let state = AppState::new(llm, cfg.rate_limit_per_minute);
    housekeeping::start_cleanup(state.conversations.clone(), state.limiter.clone());
    (crate::web::router::build_router(state), cfg.port)
}

/// Serve `app` with peer addresses available to handlers.
pub async fn serve(listener: tokio::net::TcpListener, app: axum::Router) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await
}
