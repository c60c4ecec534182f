//! Router assembly and shared application state.

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::health;
use crate::matches::{self, MatchDataClient};
use crate::realtime::{self, BroadcastEngine};

/// Composite state; `FromRef` lets each handler extract just the piece it
/// needs.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<BroadcastEngine>,
    pub matches: MatchDataClient,
}

/// Build the application router over the given state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(realtime::chat_socket))
        .route("/api/matches/upcoming", get(matches::upcoming_matches))
        .route("/api/matches/live", get(matches::live_score))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST]),
        Err(_) => {
            tracing::warn!(
                origin = %config.allowed_origin,
                "Invalid ALLOWED_ORIGIN, falling back to a closed CORS policy"
            );
            CorsLayer::new()
        }
    }
}
