use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::Product;
use crate::query::MAX_PAGE_SIZE;
use crate::repository::{ProductRepository, RepositoryError};

use super::{finish, Halt, UseCaseError, UseCaseResult};

pub const DEFAULT_FEATURED_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFeaturedInput {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Top active products by review volume and rating.
pub struct GetFeatured<R> {
    repository: R,
}

impl<R: ProductRepository> GetFeatured<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(limit = ?input.limit))]
    pub async fn execute(&self, input: GetFeaturedInput) -> Result<UseCaseResult<Vec<Product>>, RepositoryError> {
        finish("get_featured", self.run(input).await)
    }

    async fn run(&self, input: GetFeaturedInput) -> Result<Vec<Product>, Halt> {
        let limit = input.limit.unwrap_or(i64::from(DEFAULT_FEATURED_LIMIT));
        if limit < 1 {
            return Err(UseCaseError::invalid_input("limit", "limit must be at least 1").into());
        }
        let limit = limit.min(i64::from(MAX_PAGE_SIZE)) as u32;

        Ok(self.repository.find_featured(limit).await?)
    }
}
