//! Deterministic sample data for the product source.

use super::Product;

const CATEGORIES: [&str; 3] = ["Fruits", "Vegetables", "Beverages"];
const PRICES: [f64; 4] = [100.0, 200.0, 500.0, 1000.0];
const QUANTITIES: [i32; 3] = [50, 100, 150];

/// Generates `count` products with ids `1..=count`.
///
/// Category, price and quantity cycle through fixed tables by id, so the same
/// count always yields the same data.
pub fn seed_products(count: usize) -> Vec<Product> {
    (1..=count)
        .map(|i| Product {
            id: i as i64,
            name: format!("Product {}", i),
            category: CATEGORIES[i % CATEGORIES.len()].to_string(),
            price: PRICES[i % PRICES.len()],
            quantity: QUANTITIES[i % QUANTITIES.len()],
        })
        .collect()
}
