//! HTTP route definitions.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{create_research, delete_research, get_research, list_research};
use crate::monitoring;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/research", get(list_research).post(create_research))
        .route("/research/{id}", get(get_research).delete(delete_research))
        .route("/queue/status", get(monitoring::queue_status))
        .route("/metrics", get(monitoring::metrics))
        .route("/health", get(monitoring::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
