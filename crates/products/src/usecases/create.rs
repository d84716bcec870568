use tracing::instrument;

use crate::product::{NewProduct, Product};
use crate::repository::{ProductRepository, RepositoryError};

use super::{finish, Halt, UseCaseResult};

/// Create a catalog product. Validation is delegated to the entity.
pub struct CreateProduct<R> {
    repository: R,
}

impl<R: ProductRepository> CreateProduct<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(seller_id = %input.seller_id))]
    pub async fn execute(&self, input: NewProduct) -> Result<UseCaseResult<Product>, RepositoryError> {
        finish("create_product", self.run(input).await)
    }

    async fn run(&self, input: NewProduct) -> Result<Product, Halt> {
        let product = Product::create(input)?;
        let saved = self.repository.save(&product).await?;
        tracing::info!(product_id = ?saved.id(), "product created");
        Ok(saved)
    }
}
