//! API Handlers
//!
//! Product endpoints. Reads go through the cache-aside layer; writes hit the
//! source of truth first and invalidate affected keys afterwards.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CacheAside, CacheIntrospection, CacheSettings, HealthMonitor};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{HealthResponse, ProductRequest};
use crate::products::{product_key, Product, ProductSource, ALL_PRODUCTS_KEY};
use crate::store::KvStore;

/// Application state shared across all handlers.
///
/// All members share one store connection.
#[derive(Clone)]
pub struct AppState {
    /// Read-through / invalidate engine
    pub cache: CacheAside,
    /// Administrative view over the store
    pub admin: CacheIntrospection,
    /// Source of truth
    pub products: Arc<dyn ProductSource>,
}

impl AppState {
    /// Wires the cache components around one shared store.
    pub fn new(
        store: Arc<dyn KvStore>,
        settings: CacheSettings,
        products: Arc<dyn ProductSource>,
        probe_timeout: Duration,
    ) -> Self {
        let health = HealthMonitor::new(Arc::clone(&store), probe_timeout);
        Self {
            cache: CacheAside::new(Arc::clone(&store), settings),
            admin: CacheIntrospection::new(store, health),
            products,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KvStore>,
        products: Arc<dyn ProductSource>,
    ) -> Self {
        Self::new(
            store,
            CacheSettings::from_config(config),
            products,
            config.operation_timeout(),
        )
    }
}

/// Handler for GET /api/products/all
pub async fn list_products_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let source = Arc::clone(&state.products);
    let products = state
        .cache
        .get_or_set(ALL_PRODUCTS_KEY, || async move { source.fetch_all().await })
        .await?;

    Ok(Json(products))
}

/// Handler for GET /api/products/:id
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let source = Arc::clone(&state.products);
    let product = state
        .cache
        .get_or_set(&product_key(id), || async move { source.fetch_by_id(id).await })
        .await?;

    product
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))
}

/// Handler for POST /api/products
pub async fn create_product_handler(
    State(state): State<AppState>,
    Json(req): Json<ProductRequest>,
) -> Result<Response, ApiError> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::BadRequest(error_msg));
    }

    let created = state.products.insert(req.into_product()).await?;
    state.cache.invalidate(ALL_PRODUCTS_KEY).await;

    let location = format!("/api/products/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    )
        .into_response())
}

/// Handler for PUT /api/products/:id
pub async fn update_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ProductRequest>,
) -> Result<StatusCode, ApiError> {
    if id != req.id {
        return Err(ApiError::BadRequest("ID mismatch".to_string()));
    }
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::BadRequest(error_msg));
    }

    state.products.update(req.into_product()).await?;
    state
        .cache
        .invalidate_many([product_key(id), ALL_PRODUCTS_KEY.to_string()])
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/products/:id
pub async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.products.fetch_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }

    state.products.delete(id).await?;
    state
        .cache
        .invalidate_many([product_key(id), ALL_PRODUCTS_KEY.to_string()])
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
