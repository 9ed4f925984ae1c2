//! Product Source Module
//!
//! The source of truth the cache sits in front of.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Product;
use crate::error::SourceError;

// == Product Source Trait ==
/// Authoritative product storage.
///
/// The cache layer only ever sees these calls as loaders; it never knows
/// which implementation sits behind them.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Product>, SourceError>;

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Product>, SourceError>;

    /// Stores a new product under a freshly assigned id and returns it.
    async fn insert(&self, product: Product) -> Result<Product, SourceError>;

    /// Replaces an existing product; fails with `NotFound` for unknown ids.
    async fn update(&self, product: Product) -> Result<(), SourceError>;

    async fn delete(&self, id: i64) -> Result<(), SourceError>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Product>,
    next_id: i64,
}

// == In-Memory Source ==
/// Ordered in-process product table.
#[derive(Debug, Default)]
pub struct InMemoryProductSource {
    table: RwLock<Table>,
}

impl InMemoryProductSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-filled with `products`, keyed by their ids.
    pub fn with_products(products: Vec<Product>) -> Self {
        let rows: BTreeMap<i64, Product> = products.into_iter().map(|p| (p.id, p)).collect();
        let next_id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        Self {
            table: RwLock::new(Table { rows, next_id }),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl ProductSource for InMemoryProductSource {
    async fn fetch_all(&self) -> Result<Vec<Product>, SourceError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Product>, SourceError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, mut product: Product) -> Result<Product, SourceError> {
        let mut table = self.table.write().await;
        table.next_id = table.next_id.max(1);
        product.id = table.next_id;
        table.next_id += 1;
        table.rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<(), SourceError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&product.id) {
            Some(row) => {
                *row = product;
                Ok(())
            }
            None => Err(SourceError::NotFound(product.id)),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), SourceError> {
        let mut table = self.table.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(SourceError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::seed_products;

    fn widget() -> Product {
        Product {
            id: 0,
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            price: 9.5,
            quantity: 3,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_in_id_order() {
        let source = InMemoryProductSource::with_products(seed_products(5));

        let ids: Vec<i64> = source.fetch_all().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() {
        let source = InMemoryProductSource::with_products(seed_products(3));

        let created = source.insert(widget()).await.unwrap();
        assert_eq!(created.id, 4);
        assert_eq!(source.fetch_by_id(4).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_insert_into_empty_source_starts_at_one() {
        let source = InMemoryProductSource::new();
        assert_eq!(source.insert(widget()).await.unwrap().id, 1);
        assert_eq!(source.insert(widget()).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let source = InMemoryProductSource::with_products(seed_products(2));

        source.delete(2).await.unwrap();
        assert_eq!(source.insert(widget()).await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_update_existing_and_missing() {
        let source = InMemoryProductSource::with_products(seed_products(1));

        let mut product = source.fetch_by_id(1).await.unwrap().unwrap();
        product.quantity = 1;
        source.update(product.clone()).await.unwrap();
        assert_eq!(source.fetch_by_id(1).await.unwrap(), Some(product));

        let ghost = Product { id: 99, ..widget() };
        assert_eq!(source.update(ghost).await, Err(SourceError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_delete() {
        let source = InMemoryProductSource::with_products(seed_products(2));

        source.delete(1).await.unwrap();
        assert_eq!(source.len().await, 1);
        assert_eq!(source.delete(1).await, Err(SourceError::NotFound(1)));
    }
}
