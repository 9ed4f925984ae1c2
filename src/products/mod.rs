//! Products Module
//!
//! The authoritative data source sitting behind the cache, plus the cache key
//! conventions its callers rely on.

mod model;
mod seed;
mod source;

pub use model::Product;
pub use seed::seed_products;
pub use source::{InMemoryProductSource, ProductSource};

/// Cache key holding the full product list.
pub const ALL_PRODUCTS_KEY: &str = "GET_ALL_PRODUCTS";

/// Cache key for a single product.
pub fn product_key(id: i64) -> String {
    format!("Product_{}", id)
}
