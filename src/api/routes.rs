//! API Routes
//!
//! Configures the Axum router with the product and cache admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::admin::{
    cache_status_handler, clear_cache_handler, delete_cache_entry_handler,
    get_cache_entry_handler, list_cache_entries_handler,
};
use super::handlers::{
    create_product_handler, delete_product_handler, get_product_handler, health_handler,
    list_products_handler, update_product_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /api/products/all` - All products (cached)
/// - `POST /api/products` - Create a product
/// - `GET|PUT|DELETE /api/products/:id` - Single product (GET is cached)
/// - `GET /api/rediscache/status` - Cache store connectivity
/// - `GET|DELETE /api/rediscache/all` - List or clear all cache entries
/// - `GET|DELETE /api/rediscache/:key` - Inspect or delete one cache entry
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/products", post(create_product_handler))
        .route("/api/products/all", get(list_products_handler))
        .route(
            "/api/products/:id",
            get(get_product_handler)
                .put(update_product_handler)
                .delete(delete_product_handler),
        )
        .route("/api/rediscache/status", get(cache_status_handler))
        .route(
            "/api/rediscache/all",
            get(list_cache_entries_handler).delete(clear_cache_handler),
        )
        .route(
            "/api/rediscache/:key",
            get(get_cache_entry_handler).delete(delete_cache_entry_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
