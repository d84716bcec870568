//! Catalog use cases (application-level orchestration).
//!
//! Each use case owns a repository handle injected at construction and exposes a
//! single `execute(input)`:
//!
//! ```text
//! input → validate → entity rule → repository → UseCaseResult
//! ```
//!
//! `execute` returns `Result<UseCaseResult<T>, RepositoryError>`. Business rejections
//! are `Ok(UseCaseResult::Failure(..))`; repository failures surface unchanged as `Err`.
//! Use cases hold no state between invocations.

pub mod adjust_stock;
pub mod create;
pub mod delete;
pub mod featured;
pub mod get;
pub mod list;
pub mod result;
pub mod update;
pub mod update_rating;

pub use adjust_stock::{AdjustStock, AdjustStockInput};
pub use create::CreateProduct;
pub use delete::{DeleteProduct, DeleteProductInput, DeleteProductOutput};
pub use featured::{GetFeatured, GetFeaturedInput, DEFAULT_FEATURED_LIMIT};
pub use get::{GetProduct, GetProductInput};
pub use list::{ActiveFilter, ListFilters, ListProducts, ListProductsInput, ListProductsOutput};
pub use result::{ErrorCode, UseCaseError, UseCaseResult};
pub use update::{UpdateProduct, UpdateProductInput};
pub use update_rating::{UpdateRating, UpdateRatingInput};

use catalog_core::{DomainError, ProductId, SellerId};

use crate::product::Product;
use crate::repository::RepositoryError;

/// Early exit from a use case body: either a business rejection or a fatal error.
#[derive(Debug)]
pub(crate) enum Halt {
    Reject(UseCaseError),
    Fatal(RepositoryError),
}

impl From<UseCaseError> for Halt {
    fn from(value: UseCaseError) -> Self {
        Halt::Reject(value)
    }
}

impl From<DomainError> for Halt {
    fn from(value: DomainError) -> Self {
        Halt::Reject(value.into())
    }
}

impl From<RepositoryError> for Halt {
    fn from(value: RepositoryError) -> Self {
        Halt::Fatal(value)
    }
}

/// Fold a use case body into the public `execute` shape, logging the outcome.
pub(crate) fn finish<T>(
    use_case: &'static str,
    outcome: Result<T, Halt>,
) -> Result<UseCaseResult<T>, RepositoryError> {
    match outcome {
        Ok(data) => Ok(UseCaseResult::Success(data)),
        Err(Halt::Reject(err)) => {
            tracing::debug!(
                use_case,
                code = %err.code,
                field = err.field.as_deref().unwrap_or(""),
                message = %err.message,
                "use case rejected"
            );
            Ok(UseCaseResult::Failure(err))
        }
        Err(Halt::Fatal(err)) => {
            tracing::warn!(use_case, error = %err, "repository failure");
            Err(err)
        }
    }
}

/// Reject empty or whitespace-only identifiers before touching the repository.
pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId, UseCaseError> {
    ProductId::parse(raw).map_err(|_| UseCaseError::invalid_input("id", "product id is required"))
}

pub(crate) fn parse_seller_id(raw: Option<&str>) -> Result<Option<SellerId>, UseCaseError> {
    raw.map(|s| {
        SellerId::parse(s)
            .map_err(|_| UseCaseError::invalid_input("seller_id", "seller id cannot be empty"))
    })
    .transpose()
}

/// Ownership check: only applies when the caller supplied a seller identifier.
pub(crate) fn ensure_owner(product: &Product, seller_id: Option<&SellerId>) -> Result<(), UseCaseError> {
    match seller_id {
        Some(seller_id) if !product.is_owned_by(seller_id) => Err(UseCaseError::unauthorized(
            "seller is not the owner of this product",
        )),
        _ => Ok(()),
    }
}

pub(crate) fn product_not_found(id: &ProductId) -> UseCaseError {
    UseCaseError::not_found(format!("product {id} not found"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use catalog_core::ProductId;

    use crate::in_memory::InMemoryProductRepository;
    use crate::product::{NewProduct, Product, ProductChanges};
    use crate::query::{Page, Pagination, ProductFilter};
    use crate::repository::{ProductRepository, RepositoryError, RepositoryResult, StockAdjustment};

    pub fn laptop() -> NewProduct {
        NewProduct {
            name: "Test Laptop".to_string(),
            description: "A powerful laptop for testing".to_string(),
            price: 1299.99,
            stock: 50,
            category: "Electronics".to_string(),
            tags: vec!["laptop".to_string(), "computer".to_string()],
            seller_id: "seller123".to_string(),
            is_active: None,
        }
    }

    /// Repository whose every call fails, for checking that infrastructure
    /// errors propagate instead of becoming business rejections.
    pub struct BrokenRepository;

    fn down<T>() -> RepositoryResult<T> {
        Err(RepositoryError::Storage("connection refused".to_string()))
    }

    #[async_trait]
    impl ProductRepository for BrokenRepository {
        async fn find_by_id(&self, _id: &ProductId) -> RepositoryResult<Option<Product>> {
            down()
        }

        async fn find_all(
            &self,
            _filter: &ProductFilter,
            _pagination: &Pagination,
        ) -> RepositoryResult<Page<Product>> {
            down()
        }

        async fn save(&self, _product: &Product) -> RepositoryResult<Product> {
            down()
        }

        async fn update(&self, _id: &ProductId, _product: &Product) -> RepositoryResult<Option<Product>> {
            down()
        }

        async fn soft_delete(&self, _id: &ProductId) -> RepositoryResult<bool> {
            down()
        }

        async fn hard_delete(&self, _id: &ProductId) -> RepositoryResult<bool> {
            down()
        }

        async fn count(&self, _filter: &ProductFilter) -> RepositoryResult<u64> {
            down()
        }

        async fn exists(&self, _id: &ProductId) -> RepositoryResult<bool> {
            down()
        }

        async fn bulk_update(&self, _ids: &[ProductId], _changes: &ProductChanges) -> RepositoryResult<u64> {
            down()
        }

        async fn find_featured(&self, _limit: u32) -> RepositoryResult<Vec<Product>> {
            down()
        }

        async fn adjust_stock(&self, _id: &ProductId, _delta: i64) -> RepositoryResult<StockAdjustment> {
            down()
        }
    }

    /// Repository where a record disappears right after it is loaded, as if a
    /// concurrent caller hard-deleted it between the read and the write.
    #[derive(Default)]
    pub struct VanishingRepository {
        pub inner: InMemoryProductRepository,
    }

    #[async_trait]
    impl ProductRepository for VanishingRepository {
        async fn find_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
            let found = self.inner.find_by_id(id).await?;
            self.inner.hard_delete(id).await?;
            Ok(found)
        }

        async fn find_all(
            &self,
            filter: &ProductFilter,
            pagination: &Pagination,
        ) -> RepositoryResult<Page<Product>> {
            self.inner.find_all(filter, pagination).await
        }

        async fn save(&self, product: &Product) -> RepositoryResult<Product> {
            self.inner.save(product).await
        }

        async fn update(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>> {
            self.inner.update(id, product).await
        }

        async fn soft_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
            self.inner.soft_delete(id).await
        }

        async fn hard_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
            self.inner.hard_delete(id).await
        }

        async fn count(&self, filter: &ProductFilter) -> RepositoryResult<u64> {
            self.inner.count(filter).await
        }

        async fn exists(&self, id: &ProductId) -> RepositoryResult<bool> {
            self.inner.exists(id).await
        }

        async fn bulk_update(&self, ids: &[ProductId], changes: &ProductChanges) -> RepositoryResult<u64> {
            self.inner.bulk_update(ids, changes).await
        }

        async fn find_featured(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
            self.inner.find_featured(limit).await
        }

        async fn adjust_stock(&self, id: &ProductId, delta: i64) -> RepositoryResult<StockAdjustment> {
            self.inner.adjust_stock(id, delta).await
        }
    }
}
