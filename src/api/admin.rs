//! Cache Admin Handlers
//!
//! Direct inspection and manipulation of cache contents.

use axum::{
    extract::{Path, State},
    Json,
};

use super::handlers::AppState;
use crate::error::Result;
use crate::models::{CacheEntryResponse, CacheStatusResponse, MessageResponse};

/// Handler for GET /api/rediscache/status
pub async fn cache_status_handler(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    Json(state.admin.status().await.into())
}

/// Handler for GET /api/rediscache/all
pub async fn list_cache_entries_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<CacheEntryResponse>>> {
    let entries = state.admin.list_all().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/rediscache/:key
pub async fn get_cache_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntryResponse>> {
    let entry = state.admin.get_entry(&key).await?;
    Ok(Json(entry.into()))
}

/// Handler for DELETE /api/rediscache/all
pub async fn clear_cache_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.admin.clear_all().await?;
    Ok(Json(MessageResponse::all_cleared()))
}

/// Handler for DELETE /api/rediscache/:key
pub async fn delete_cache_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.admin.delete_entry(&key).await?;
    Ok(Json(MessageResponse::cleared(&key)))
}
