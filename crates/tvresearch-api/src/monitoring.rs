//! Health, metrics and queue status handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tvresearch_pipeline::{PipelineMetrics, QueueStatus};

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Json<PipelineMetrics>, ApiError> {
    Ok(Json(state.service.metrics().await?))
}

/// GET /queue/status
pub async fn queue_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStatus>, ApiError> {
    Ok(Json(state.service.queue_status().await?))
}
