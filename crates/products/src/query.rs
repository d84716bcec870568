//! Catalog query parameters: filters, sorting and pagination.
//!
//! These are plain domain values; repository adapters translate them into
//! whatever their storage understands.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use catalog_core::SellerId;

use crate::product::Product;

/// Default page size when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Hard upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter criteria for catalog queries. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring match on name, description or any tag.
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive exact match.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Matches when the product carries any of these tags (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = product.name().to_lowercase().contains(&needle)
                || product.description().to_lowercase().contains(&needle)
                || product.tags().iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if product.category().to_lowercase() != category.trim().to_lowercase() {
                return false;
            }
        }

        if let Some(seller_id) = &self.seller_id {
            if !product.is_owned_by(seller_id) {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if product.price() < min {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if product.price() > max {
                return false;
            }
        }

        if let Some(is_active) = self.is_active {
            if product.is_active() != is_active {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let any = self.tags.iter().any(|wanted| {
                product
                    .tags()
                    .iter()
                    .any(|t| t.to_lowercase() == wanted.trim().to_lowercase())
            });
            if !any {
                return false;
            }
        }

        true
    }
}

/// Sortable scalar fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Price,
    Stock,
    Category,
    Rating,
    ReviewCount,
}

impl SortField {
    /// SQL sort keys for this field, most significant first.
    ///
    /// Text fields sort case-insensitively with a byte-order (`"C"`) tie-break,
    /// which is the order `compare` produces in memory.
    pub fn sql_keys(self) -> &'static [&'static str] {
        match self {
            SortField::CreatedAt => &["created_at"],
            SortField::UpdatedAt => &["updated_at"],
            SortField::Name => &[r#"lower(name) COLLATE "C""#, r#"name COLLATE "C""#],
            SortField::Price => &["price"],
            SortField::Stock => &["stock"],
            SortField::Category => &[r#"lower(category) COLLATE "C""#, r#"category COLLATE "C""#],
            SortField::Rating => &["rating"],
            SortField::ReviewCount => &["review_count"],
        }
    }

    /// Ascending comparison of two products on this field.
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
            SortField::Name => compare_text(a.name(), b.name()),
            SortField::Price => a.price().total_cmp(&b.price()),
            SortField::Stock => a.stock().cmp(&b.stock()),
            SortField::Category => compare_text(a.category(), b.category()),
            SortField::Rating => a.rating().total_cmp(&b.rating()),
            SortField::ReviewCount => a.review_count().cmp(&b.review_count()),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Pagination parameters (1-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Pagination {
    /// Build pagination, forcing `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, sort_by: SortField, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    /// Ordering of two products under this pagination's sort settings.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = self.sort_by.compare(a, b);
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Pagination metadata attached to a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    /// Total number of records matching the filter (across all pages).
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(pagination: &Pagination, total: u64) -> Self {
        let page_size = u64::from(pagination.page_size.max(1));
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages: total.div_ceil(page_size),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total: u64) -> Self {
        Self {
            items,
            meta: PageMeta::new(pagination, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
