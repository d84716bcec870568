use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::Product;
use crate::repository::{ProductRepository, RepositoryError};

use super::{finish, parse_product_id, product_not_found, ErrorCode, Halt, UseCaseError, UseCaseResult};

/// Aggregate pushed by the review subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRatingInput {
    pub id: String,
    pub rating: f64,
    pub review_count: u32,
}

/// Store an externally computed rating and review count.
pub struct UpdateRating<R> {
    repository: R,
}

impl<R: ProductRepository> UpdateRating<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(product_id = %input.id, rating = input.rating))]
    pub async fn execute(&self, input: UpdateRatingInput) -> Result<UseCaseResult<Product>, RepositoryError> {
        finish("update_rating", self.run(input).await)
    }

    async fn run(&self, input: UpdateRatingInput) -> Result<Product, Halt> {
        let id = parse_product_id(&input.id)?;

        let current = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| product_not_found(&id))?;

        let rated = current.update_rating(input.rating, input.review_count)?;

        self.repository.update(&id, &rated).await?.ok_or_else(|| {
            UseCaseError::new(ErrorCode::UpdateFailed, format!("product {id} could not be updated")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::in_memory::InMemoryProductRepository;
    use crate::usecases::test_support::{laptop, VanishingRepository};

    async fn seeded() -> (Arc<InMemoryProductRepository>, String) {
        let repo = Arc::new(InMemoryProductRepository::new());
        let saved = repo.save(&Product::create(laptop()).unwrap()).await.unwrap();
        (repo, saved.id().unwrap().to_string())
    }

    fn input(id: &str, rating: f64, review_count: u32) -> UpdateRatingInput {
        UpdateRatingInput {
            id: id.to_string(),
            rating,
            review_count,
        }
    }

    #[tokio::test]
    async fn stores_rating_aggregate() {
        let (repo, id) = seeded().await;
        let rated = UpdateRating::new(repo.clone())
            .execute(input(&id, 4.2, 17))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(rated.rating(), 4.2);
        assert_eq!(rated.review_count(), 17);

        let stored = repo.find_by_id(&id.as_str().into()).await.unwrap().unwrap();
        assert_eq!(stored.review_count(), 17);
    }

    #[tokio::test]
    async fn out_of_range_rating_is_validation_error() {
        let (repo, id) = seeded().await;
        let result = UpdateRating::new(repo).execute(input(&id, 5.5, 1)).await.unwrap();
        let err = result.error().unwrap();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("rating"));
    }

    #[tokio::test]
    async fn missing_and_vanished_products() {
        let (repo, _) = seeded().await;
        let missing = UpdateRating::new(repo).execute(input("missing", 3.0, 1)).await.unwrap();
        assert_eq!(missing.error().unwrap().code, ErrorCode::NotFound);

        let repo = VanishingRepository::default();
        let saved = repo.inner.save(&Product::create(laptop()).unwrap()).await.unwrap();
        let id = saved.id().unwrap().to_string();
        let vanished = UpdateRating::new(repo).execute(input(&id, 3.0, 1)).await.unwrap();
        assert_eq!(vanished.error().unwrap().code, ErrorCode::UpdateFailed);
    }
}
