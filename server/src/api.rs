//! API Router and Application State
//!
//! Central routing configuration and shared state.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::slack::ChatApi;
use crate::sync::dedup::DedupCache;
use crate::webhook;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,
    /// Outbound platform API client
    pub api: Arc<dyn ChatApi>,
    /// Recently-processed user cache (process-wide)
    pub dedup: Arc<DedupCache>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, api: Arc<dyn ChatApi>) -> Self {
        Self {
            config: Arc::new(config),
            api,
            dedup: Arc::new(DedupCache::new()),
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(webhook::handlers::receive_event))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
