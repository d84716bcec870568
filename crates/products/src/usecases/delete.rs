use serde::{Deserialize, Serialize};
use tracing::instrument;

use catalog_core::ProductId;

use crate::repository::{ProductRepository, RepositoryError};

use super::{
    ensure_owner, finish, parse_product_id, parse_seller_id, product_not_found, ErrorCode, Halt,
    UseCaseError, UseCaseResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProductInput {
    pub id: String,
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Permanently remove instead of deactivating.
    #[serde(default)]
    pub hard_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProductOutput {
    pub id: ProductId,
    pub hard_deleted: bool,
}

/// Soft- or hard-delete a product.
pub struct DeleteProduct<R> {
    repository: R,
}

impl<R: ProductRepository> DeleteProduct<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(product_id = %input.id, hard = input.hard_delete))]
    pub async fn execute(
        &self,
        input: DeleteProductInput,
    ) -> Result<UseCaseResult<DeleteProductOutput>, RepositoryError> {
        finish("delete_product", self.run(input).await)
    }

    async fn run(&self, input: DeleteProductInput) -> Result<DeleteProductOutput, Halt> {
        let id = parse_product_id(&input.id)?;
        let seller_id = parse_seller_id(input.seller_id.as_deref())?;

        let current = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| product_not_found(&id))?;

        ensure_owner(&current, seller_id.as_ref())?;

        let deleted = if input.hard_delete {
            self.repository.hard_delete(&id).await?
        } else {
            self.repository.soft_delete(&id).await?
        };

        if !deleted {
            return Err(UseCaseError::new(
                ErrorCode::DeleteFailed,
                format!("product {id} could not be deleted"),
            )
            .into());
        }

        tracing::info!(product_id = %id, hard = input.hard_delete, "product deleted");
        Ok(DeleteProductOutput {
            id,
            hard_deleted: input.hard_delete,
        })
    }
}
