use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use catalog_core::{DomainError, DomainResult, Entity, ProductId, SellerId};

/// Allowed name length, in characters, after trimming.
pub const NAME_LENGTH: RangeInclusive<usize> = 3..=200;
/// Allowed description length, in characters, after trimming.
pub const DESCRIPTION_LENGTH: RangeInclusive<usize> = 10..=2000;
/// Allowed category length, in characters, after trimming.
pub const CATEGORY_LENGTH: RangeInclusive<usize> = 2..=100;
/// Upper bound of the aggregate rating scale (lower bound is 0).
pub const MAX_RATING: f64 = 5.0;

/// Creation request for a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub seller_id: String,
    /// Defaults to active when omitted.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial field replacement for an existing product.
///
/// Only fields that are `Some` are validated and applied. Ownership, rating and
/// creation time are not changeable through this path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.is_active.is_none()
    }
}

/// Plain persisted/serialized form of a product.
///
/// Storage adapters read and write this shape; `Product::reconstruct` turns it
/// back into an entity without re-running creation validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Option<ProductId>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
    pub tags: Vec<String>,
    pub seller_id: SellerId,
    pub is_active: bool,
    pub rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog product snapshot.
///
/// Immutable: every business operation returns a new snapshot and leaves the
/// receiver untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: Option<ProductId>,
    name: String,
    description: String,
    price: f64,
    stock: i64,
    category: String,
    tags: BTreeSet<String>,
    seller_id: SellerId,
    is_active: bool,
    rating: f64,
    review_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate a creation request and build a new, not-yet-persisted product.
    pub fn create(request: NewProduct) -> DomainResult<Self> {
        Self::create_at(request, Utc::now())
    }

    /// Same as [`Product::create`] with an explicit creation time.
    pub fn create_at(request: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_text("name", &request.name, NAME_LENGTH)?;
        let description = validate_text("description", &request.description, DESCRIPTION_LENGTH)?;
        let price = validate_price(request.price)?;
        let stock = validate_stock(request.stock)?;
        let category = validate_text("category", &request.category, CATEGORY_LENGTH)?;
        let tags = validate_tags(&request.tags)?;
        let seller_id = validate_seller(&request.seller_id)?;

        Ok(Self {
            id: None,
            name,
            description,
            price,
            stock,
            category,
            tags,
            seller_id,
            is_active: request.is_active.unwrap_or(true),
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a product from persisted state.
    ///
    /// No validation is performed: the repository is trusted to hold valid data.
    pub fn reconstruct(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            price: record.price,
            stock: record.stock,
            category: record.category,
            tags: record.tags.into_iter().collect(),
            seller_id: record.seller_id,
            is_active: record.is_active,
            rating: record.rating,
            review_count: record.review_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            category: self.category.clone(),
            tags: self.tags.iter().cloned().collect(),
            seller_id: self.seller_id.clone(),
            is_active: self.is_active,
            rating: self.rating,
            review_count: self.review_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Attach the identity assigned by a repository.
    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }

    /// Apply a partial change set, validating only the fields present.
    pub fn update(&self, changes: &ProductChanges) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(name) = &changes.name {
            next.name = validate_text("name", name, NAME_LENGTH)?;
        }
        if let Some(description) = &changes.description {
            next.description = validate_text("description", description, DESCRIPTION_LENGTH)?;
        }
        if let Some(price) = changes.price {
            next.price = validate_price(price)?;
        }
        if let Some(stock) = changes.stock {
            next.stock = validate_stock(stock)?;
        }
        if let Some(category) = &changes.category {
            next.category = validate_text("category", category, CATEGORY_LENGTH)?;
        }
        if let Some(tags) = &changes.tags {
            next.tags = validate_tags(tags)?;
        }
        if let Some(is_active) = changes.is_active {
            next.is_active = is_active;
        }

        Ok(next.touched())
    }

    pub fn activate(&self) -> Self {
        let mut next = self.clone();
        next.is_active = true;
        next.touched()
    }

    pub fn deactivate(&self) -> Self {
        let mut next = self.clone();
        next.is_active = false;
        next.touched()
    }

    /// Return a snapshot with `stock + delta`. A negative result is rejected, never clamped.
    pub fn adjust_stock(&self, delta: i64) -> DomainResult<Self> {
        let stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock", "stock adjustment overflows"))?;
        if stock < 0 {
            return Err(DomainError::validation(
                "stock",
                format!(
                    "insufficient stock: {} available, adjustment of {delta} requested",
                    self.stock
                ),
            ));
        }

        let mut next = self.clone();
        next.stock = stock;
        Ok(next.touched())
    }

    pub fn increase_stock(&self, quantity: u32) -> DomainResult<Self> {
        self.adjust_stock(i64::from(quantity))
    }

    pub fn decrease_stock(&self, quantity: u32) -> DomainResult<Self> {
        self.adjust_stock(-i64::from(quantity))
    }

    /// Write an externally computed rating aggregate.
    pub fn update_rating(&self, rating: f64, review_count: u32) -> DomainResult<Self> {
        let mut next = self.clone();
        next.rating = validate_rating(rating)?;
        next.review_count = review_count;
        Ok(next.touched())
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn has_sufficient_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    pub fn is_owned_by(&self, seller_id: &SellerId) -> bool {
        self.seller_id == *seller_id
    }

    pub fn id(&self) -> Option<&ProductId> {
        self.id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn seller_id(&self) -> &SellerId {
        &self.seller_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn review_count(&self) -> u32 {
        self.review_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Timestamps never move backwards, even if the wall clock does.
    fn touched(mut self) -> Self {
        self.updated_at = Utc::now().max(self.updated_at);
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }
}

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

fn validate_text(
    field: &'static str,
    value: &str,
    bounds: RangeInclusive<usize>,
) -> DomainResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < *bounds.start() {
        return Err(DomainError::validation(
            field,
            format!("{field} must be at least {} characters", bounds.start()),
        ));
    }
    if len > *bounds.end() {
        return Err(DomainError::validation(
            field,
            format!("{field} must be at most {} characters", bounds.end()),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> DomainResult<f64> {
    if !price.is_finite() {
        return Err(DomainError::validation("price", "price must be a valid number"));
    }
    if price < 0.0 {
        return Err(DomainError::validation("price", "price cannot be negative"));
    }
    Ok(price)
}

fn validate_stock(stock: i64) -> DomainResult<i64> {
    if stock < 0 {
        return Err(DomainError::validation("stock", "stock cannot be negative"));
    }
    Ok(stock)
}

fn validate_tags(tags: &[String]) -> DomainResult<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("tags", "tags cannot be empty"));
        }
        set.insert(trimmed.to_string());
    }
    Ok(set)
}

fn validate_seller(seller_id: &str) -> DomainResult<SellerId> {
    SellerId::parse(seller_id)
        .map_err(|_| DomainError::validation("seller_id", "seller id is required"))
}

fn validate_rating(rating: f64) -> DomainResult<f64> {
    if rating.is_nan() || !(0.0..=MAX_RATING).contains(&rating) {
        return Err(DomainError::validation(
            "rating",
            format!("rating must be between 0 and {MAX_RATING}"),
        ));
    }
    Ok(rating)
}
