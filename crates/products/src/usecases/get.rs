use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::Product;
use crate::repository::{ProductRepository, RepositoryError};

use super::{finish, parse_product_id, product_not_found, Halt, UseCaseResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProductInput {
    pub id: String,
}

/// Fetch a single product. Inactive products are reported as not found.
pub struct GetProduct<R> {
    repository: R,
}

impl<R: ProductRepository> GetProduct<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(product_id = %input.id))]
    pub async fn execute(&self, input: GetProductInput) -> Result<UseCaseResult<Product>, RepositoryError> {
        finish("get_product", self.run(input).await)
    }

    async fn run(&self, input: GetProductInput) -> Result<Product, Halt> {
        let id = parse_product_id(&input.id)?;

        match self.repository.find_by_id(&id).await? {
            Some(product) if product.is_active() => Ok(product),
            _ => Err(product_not_found(&id).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::in_memory::InMemoryProductRepository;
    use crate::usecases::test_support::{laptop, BrokenRepository};
    use crate::usecases::ErrorCode;

    async fn seeded() -> (Arc<InMemoryProductRepository>, Product) {
        let repo = Arc::new(InMemoryProductRepository::new());
        let saved = repo.save(&Product::create(laptop()).unwrap()).await.unwrap();
        (repo, saved)
    }

    fn input(id: &str) -> GetProductInput {
        GetProductInput { id: id.to_string() }
    }

    #[tokio::test]
    async fn returns_active_product() {
        let (repo, saved) = seeded().await;
        let id = saved.id().unwrap().to_string();
        let product = GetProduct::new(repo).execute(input(&id)).await.unwrap().into_result().unwrap();
        assert_eq!(product, saved);
    }

    #[tokio::test]
    async fn blank_id_is_invalid_input() {
        let (repo, _) = seeded().await;
        for raw in ["", "   "] {
            let result = GetProduct::new(repo.clone()).execute(input(raw)).await.unwrap();
            assert_eq!(result.error().unwrap().code, ErrorCode::InvalidInput);
        }
    }

    #[tokio::test]
    async fn missing_and_inactive_are_not_found() {
        let (repo, saved) = seeded().await;
        let use_case = GetProduct::new(repo.clone());

        let missing = use_case.execute(input("does-not-exist")).await.unwrap();
        assert_eq!(missing.error().unwrap().code, ErrorCode::NotFound);

        let id = saved.id().cloned().unwrap();
        repo.soft_delete(&id).await.unwrap();
        let inactive = use_case.execute(input(id.as_str())).await.unwrap();
        assert_eq!(inactive.error().unwrap().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn repository_failure_propagates() {
        assert!(GetProduct::new(BrokenRepository).execute(input("p-1")).await.is_err());
    }
}
