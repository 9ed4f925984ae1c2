//! API Module
//!
//! HTTP handlers and routing.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `/api/products/...` - Product CRUD, reads served cache-aside
//! - `/api/rediscache/...` - Cache inspection and manipulation

pub mod admin;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
