//! Research workflow handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tvresearch_pipeline::RecordView;
use tvresearch_pipeline::service::DEFAULT_LIST_LIMIT;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to start a research workflow.
#[derive(Debug, Default, Deserialize)]
pub struct ResearchRequest {
    /// Topic to research. Trending topics when absent.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Paging for listings.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

/// Confirmation of a deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Start a research workflow.
///
/// POST /research
pub async fn create_research(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<RecordView>, ApiError> {
    info!("Research request: topic={:?}", request.topic);
    let view = state.service.submit(request.topic).await?;
    Ok(Json(view))
}

/// List research records, newest first.
///
/// GET /research
pub async fn list_research(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RecordView>>, ApiError> {
    if query.limit == 0 {
        return Err(ApiError::BadRequest("limit must be greater than zero".to_string()));
    }
    Ok(Json(state.service.list(query.limit, query.offset).await?))
}

/// Get one research record.
///
/// GET /research/{id}
pub async fn get_research(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RecordView>, ApiError> {
    Ok(Json(state.service.get(id).await?))
}

/// Delete a research record.
///
/// DELETE /research/{id}
pub async fn delete_research(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.service.delete(id).await?;
    Ok(Json(DeleteResponse {
        message: "Research result deleted successfully".to_string(),
    }))
}
