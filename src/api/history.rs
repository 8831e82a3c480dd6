use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HistoryEntryDto, auth::AuthUser};

/// Callers may ask for arbitrary pages, but the page size is clamped.
const MAX_PAGE_SIZE: u64 = 1000;
const DEFAULT_PAGE_SIZE: u64 = 100;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct CreateHistoryRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub icon: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// GET /history
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryEntryDto>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let entries = state
        .store()
        .list_history(query.kind.as_deref(), limit, offset)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list history: {e}")))?;

    let entries = entries.into_iter().map(HistoryEntryDto::from).collect();

    Ok(Json(ApiResponse::success(entries)))
}

/// POST /history
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateHistoryRequest>,
) -> Result<Json<ApiResponse<HistoryEntryDto>>, ApiError> {
    let kind = payload
        .kind
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required field: type"))?;
    let title = payload
        .title
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required field: title"))?;

    let metadata = payload
        .metadata
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

    let entry = state
        .store()
        .insert_history(
            &kind,
            &title,
            payload.desc.as_deref().unwrap_or(""),
            payload.icon.as_deref().unwrap_or(""),
            auth.id,
            &metadata,
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert history entry: {e}")))?;

    Ok(Json(ApiResponse::success_with_message(
        "History entry added",
        HistoryEntryDto::from(entry),
    )))
}

/// DELETE /history/{id}
pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .store()
        .delete_history_entry(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete history entry: {e}")))?;

    Ok(Json(ApiResponse::ack("History entry deleted")))
}

/// DELETE /history
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = state
        .store()
        .clear_history()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear history: {e}")))?;

    tracing::info!(removed, "History cleared");

    Ok(Json(ApiResponse::ack("History cleared")))
}
