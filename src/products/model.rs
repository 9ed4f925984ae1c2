use serde::{Deserialize, Serialize};

/// A product as stored in the source of truth and cached as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i32,
}
