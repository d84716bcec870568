use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::product::Product;
use crate::query::{
    PageMeta, Pagination, ProductFilter, SortField, SortOrder, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::repository::{ProductRepository, RepositoryError};

use super::{finish, parse_seller_id, Halt, UseCaseError, UseCaseResult};

/// Which lifecycle states a listing includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveFilter {
    #[default]
    Active,
    Inactive,
    Any,
}

impl ActiveFilter {
    fn as_flag(self) -> Option<bool> {
        match self {
            ActiveFilter::Active => Some(true),
            ActiveFilter::Inactive => Some(false),
            ActiveFilter::Any => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_active: ActiveFilter,
}

/// Raw listing request. Page and limit are signed so out-of-range values can be
/// rejected rather than failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListProductsInput {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort_by: Option<SortField>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub filters: ListFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListProductsOutput {
    pub products: Vec<Product>,
    /// Resolved pagination (after defaults and caps) plus totals.
    pub pagination: PageMeta,
}

/// Paginated, filtered catalog listing.
pub struct ListProducts<R> {
    repository: R,
}

impl<R: ProductRepository> ListProducts<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, input), fields(page = ?input.page, limit = ?input.limit))]
    pub async fn execute(
        &self,
        input: ListProductsInput,
    ) -> Result<UseCaseResult<ListProductsOutput>, RepositoryError> {
        finish("list_products", self.run(input).await)
    }

    async fn run(&self, input: ListProductsInput) -> Result<ListProductsOutput, Halt> {
        let pagination = resolve_pagination(&input)?;
        let filter = resolve_filter(input.filters)?;

        let page = self.repository.find_all(&filter, &pagination).await?;
        tracing::debug!(returned = page.items.len(), total = page.meta.total, "products listed");

        Ok(ListProductsOutput {
            products: page.items,
            pagination: page.meta,
        })
    }
}

fn resolve_pagination(input: &ListProductsInput) -> Result<Pagination, UseCaseError> {
    let page = input.page.unwrap_or(1);
    if page < 1 {
        return Err(UseCaseError::invalid_input("page", "page must be at least 1"));
    }
    let page = u32::try_from(page).map_err(|_| UseCaseError::invalid_input("page", "page is too large"))?;

    let limit = input.limit.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
    if limit < 1 {
        return Err(UseCaseError::invalid_input("limit", "limit must be at least 1"));
    }
    let page_size = limit.min(i64::from(MAX_PAGE_SIZE)) as u32;

    Ok(Pagination {
        page,
        page_size,
        sort_by: input.sort_by.unwrap_or_default(),
        sort_order: input.sort_order.unwrap_or_default(),
    })
}

fn resolve_filter(filters: ListFilters) -> Result<ProductFilter, UseCaseError> {
    for bound in [filters.min_price, filters.max_price].into_iter().flatten() {
        if bound.is_nan() || bound < 0.0 {
            return Err(UseCaseError::invalid_input(
                "filters.price",
                "price bounds must be non-negative numbers",
            ));
        }
    }
    if let (Some(min), Some(max)) = (filters.min_price, filters.max_price) {
        if min > max {
            return Err(UseCaseError::invalid_input(
                "filters.price",
                "min_price cannot exceed max_price",
            ));
        }
    }

    let non_blank = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    Ok(ProductFilter {
        search: non_blank(filters.search),
        category: non_blank(filters.category),
        seller_id: parse_seller_id(filters.seller_id.as_deref())?,
        min_price: filters.min_price,
        max_price: filters.max_price,
        is_active: filters.is_active.as_flag(),
        tags: filters.tags,
    })
}
