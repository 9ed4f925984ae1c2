//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure reported by a key-value store client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (refused, dropped, timed out)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but the command failed
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

// == Cache Error Enum ==
/// Error taxonomy surfaced by the administrative cache operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Transport or connection failure reaching the store
    #[error("Redis server is currently unavailable")]
    StoreUnavailable(String),

    /// Key absent in the store
    #[error("Cache entry not found: {0}")]
    EntryNotFound(String),

    /// Any other unexpected failure inside the cache layer
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CacheError::StoreUnavailable(msg),
            StoreError::Backend(msg) => CacheError::Internal(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            CacheError::StoreUnavailable(details) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string(), "details": details }),
            ),
            CacheError::EntryNotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Cache entry not found." }),
            ),
            CacheError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// == Source Error Enum ==
/// Failure of the authoritative data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Product {0} not found")]
    NotFound(i64),

    #[error("Source failure: {0}")]
    Internal(String),
}

// == Api Error Enum ==
/// Errors returned by the product endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Source(SourceError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Product {} not found", id) })),
            )
                .into_response(),
            ApiError::Source(err) => {
                tracing::error!(error = %err, "source of truth failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the administrative cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
