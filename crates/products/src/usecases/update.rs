use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::{Product, ProductChanges};
use crate::repository::{ProductRepository, RepositoryError};

use super::{
    ensure_owner, finish, parse_product_id, parse_seller_id, product_not_found, ErrorCode, Halt,
    UseCaseError, UseCaseResult,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProductInput {
    pub id: String,
    #[serde(default)]
    pub changes: ProductChanges,
    /// When present, the update is only allowed for the owning seller.
    #[serde(default)]
    pub seller_id: Option<String>,
}

/// Apply a partial update to an existing product.
pub struct UpdateProduct<R> {
    repository: R,
}

impl<R: ProductRepository> UpdateProduct<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(product_id = %input.id))]
    pub async fn execute(&self, input: UpdateProductInput) -> Result<UseCaseResult<Product>, RepositoryError> {
        finish("update_product", self.run(input).await)
    }

    async fn run(&self, input: UpdateProductInput) -> Result<Product, Halt> {
        let id = parse_product_id(&input.id)?;
        let seller_id = parse_seller_id(input.seller_id.as_deref())?;

        let current = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| product_not_found(&id))?;

        ensure_owner(&current, seller_id.as_ref())?;

        let next = current.update(&input.changes)?;

        let updated = self.repository.update(&id, &next).await?.ok_or_else(|| {
            UseCaseError::new(
                ErrorCode::UpdateFailed,
                format!("product {id} could not be updated"),
            )
        })?;

        tracing::info!(product_id = %id, "product updated");
        Ok(updated)
    }
}
