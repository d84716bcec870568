//! Storage-agnostic catalog repository boundary.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::{ProductId, SellerId};

use crate::product::{Product, ProductChanges};
use crate::query::{Page, Pagination, ProductFilter};

/// Repository operation error.
///
/// These are **infrastructure errors** (connectivity, corrupt rows, poisoned
/// locks) as opposed to domain errors. "Not found" is never an error: lookups
/// return `None` and mutations return `false`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("lock poisoned")]
    LockPoisoned,

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Outcome of a conditional stock adjustment.
#[derive(Debug, Clone, PartialEq)]
pub enum StockAdjustment {
    /// The change was applied; carries the persisted snapshot.
    Applied(Product),
    /// The change would have driven stock negative; nothing was written.
    Insufficient { available: i64 },
    /// `stock + delta` does not fit in an `i64`; nothing was written.
    Overflow { available: i64 },
    NotFound,
}

/// Persistence contract for catalog products.
///
/// Implementations must:
/// - return `Ok(None)` / `Ok(false)` for missing records, and `Err` only for genuine
///   infrastructure failures
/// - assign an identity in `save`
/// - apply `adjust_stock` atomically (no snapshot-then-write)
/// - apply `bulk_update` atomically per record; partial application across the batch
///   is reported through the returned count
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>>;

    async fn find_all(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>>;

    async fn find_by_seller(
        &self,
        seller_id: &SellerId,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        let filter = ProductFilter {
            seller_id: Some(seller_id.clone()),
            ..Default::default()
        };
        self.find_all(&filter, pagination).await
    }

    async fn find_by_category(
        &self,
        category: &str,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        let filter = ProductFilter {
            category: Some(category.to_string()),
            ..Default::default()
        };
        self.find_all(&filter, pagination).await
    }

    /// Persist a new product and return it with its assigned identity.
    async fn save(&self, product: &Product) -> RepositoryResult<Product>;

    /// Replace an existing record. Returns `None` if `id` does not exist.
    async fn update(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>>;

    async fn soft_delete(&self, id: &ProductId) -> RepositoryResult<bool>;

    async fn hard_delete(&self, id: &ProductId) -> RepositoryResult<bool>;

    async fn count(&self, filter: &ProductFilter) -> RepositoryResult<u64>;

    async fn exists(&self, id: &ProductId) -> RepositoryResult<bool>;

    /// Apply the same changes to many records. Returns how many were modified.
    async fn bulk_update(&self, ids: &[ProductId], changes: &ProductChanges) -> RepositoryResult<u64>;

    /// Active products ranked by review count, then rating, then recency.
    async fn find_featured(&self, limit: u32) -> RepositoryResult<Vec<Product>>;

    async fn search(&self, query: &str, pagination: &Pagination) -> RepositoryResult<Page<Product>> {
        let filter = ProductFilter {
            search: Some(query.to_string()),
            ..Default::default()
        };
        self.find_all(&filter, pagination).await
    }

    /// Conditionally apply `stock + delta`; never writes a negative stock.
    async fn adjust_stock(&self, id: &ProductId, delta: i64) -> RepositoryResult<StockAdjustment>;
}

#[async_trait]
impl<R> ProductRepository for Arc<R>
where
    R: ProductRepository + ?Sized,
{
    async fn find_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        (**self).find_by_id(id).await
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        (**self).find_all(filter, pagination).await
    }

    async fn find_by_seller(
        &self,
        seller_id: &SellerId,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        (**self).find_by_seller(seller_id, pagination).await
    }

    async fn find_by_category(
        &self,
        category: &str,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        (**self).find_by_category(category, pagination).await
    }

    async fn save(&self, product: &Product) -> RepositoryResult<Product> {
        (**self).save(product).await
    }

    async fn update(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>> {
        (**self).update(id, product).await
    }

    async fn soft_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        (**self).soft_delete(id).await
    }

    async fn hard_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        (**self).hard_delete(id).await
    }

    async fn count(&self, filter: &ProductFilter) -> RepositoryResult<u64> {
        (**self).count(filter).await
    }

    async fn exists(&self, id: &ProductId) -> RepositoryResult<bool> {
        (**self).exists(id).await
    }

    async fn bulk_update(&self, ids: &[ProductId], changes: &ProductChanges) -> RepositoryResult<u64> {
        (**self).bulk_update(ids, changes).await
    }

    async fn find_featured(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        (**self).find_featured(limit).await
    }

    async fn search(&self, query: &str, pagination: &Pagination) -> RepositoryResult<Page<Product>> {
        (**self).search(query, pagination).await
    }

    async fn adjust_stock(&self, id: &ProductId, delta: i64) -> RepositoryResult<StockAdjustment> {
        (**self).adjust_stock(id, delta).await
    }
}
