use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::Product;
use crate::repository::{ProductRepository, RepositoryError, StockAdjustment};

use super::{
    ensure_owner, finish, parse_product_id, parse_seller_id, product_not_found, ErrorCode, Halt,
    UseCaseError, UseCaseResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStockInput {
    pub id: String,
    /// Signed change: positive restocks, negative deducts.
    pub delta: i64,
    #[serde(default)]
    pub seller_id: Option<String>,
}

/// Add or deduct stock through the repository's conditional update, so
/// concurrent deductions cannot drive stock negative.
pub struct AdjustStock<R> {
    repository: R,
}

impl<R: ProductRepository> AdjustStock<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(product_id = %input.id, delta = input.delta))]
    pub async fn execute(&self, input: AdjustStockInput) -> Result<UseCaseResult<Product>, RepositoryError> {
        finish("adjust_stock", self.run(input).await)
    }

    async fn run(&self, input: AdjustStockInput) -> Result<Product, Halt> {
        let id = parse_product_id(&input.id)?;
        let seller_id = parse_seller_id(input.seller_id.as_deref())?;
        if input.delta == 0 {
            return Err(UseCaseError::invalid_input("delta", "delta cannot be zero").into());
        }

        let current = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| product_not_found(&id))?;
        ensure_owner(&current, seller_id.as_ref())?;
        if current.stock().checked_add(input.delta).is_none() {
            return Err(stock_overflow(current.stock(), input.delta).into());
        }

        match self.repository.adjust_stock(&id, input.delta).await? {
            StockAdjustment::Applied(product) => {
                tracing::info!(product_id = %id, stock = product.stock(), "stock adjusted");
                Ok(product)
            }
            StockAdjustment::Insufficient { available } => Err(UseCaseError::new(
                ErrorCode::InsufficientStock,
                format!("insufficient stock: {available} available, adjustment of {} requested", input.delta),
            )
            .with_field("stock")
            .into()),
            StockAdjustment::Overflow { available } => Err(stock_overflow(available, input.delta).into()),
            StockAdjustment::NotFound => Err(UseCaseError::new(
                ErrorCode::UpdateFailed,
                format!("product {id} could not be updated"),
            )
            .into()),
        }
    }
}

fn stock_overflow(available: i64, delta: i64) -> UseCaseError {
    UseCaseError::new(
        ErrorCode::ValidationError,
        format!("stock adjustment overflows: {available} available, adjustment of {delta} requested"),
    )
    .with_field("stock")
}
