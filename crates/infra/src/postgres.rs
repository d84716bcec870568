//! Postgres-backed product repository.
//!
//! ## Error Mapping
//!
//! | SQLx Error | RepositoryError |
//! |------------|-----------------|
//! | Database (any code) | `Storage` (message carries the operation and SQLSTATE) |
//! | RowNotFound | `Storage` (queries use `fetch_optional`, so this is unexpected) |
//! | ColumnDecode / ColumnNotFound | `Corrupt` |
//! | PoolClosed, Io, Tls, other | `Storage` |
//!
//! ## Atomic stock changes
//!
//! `adjust_stock` is a single conditional `UPDATE` guarded by
//! `stock + $2 BETWEEN 0 AND i64::MAX` (evaluated in `numeric`), so concurrent
//! deductions serialize on the row and can never oversell, and a restock past
//! the `BIGINT` range is reported as `Overflow` rather than a database error.
//! `bulk_update` locks each row (`SELECT ... FOR UPDATE`) in its own transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use catalog_core::{ProductId, SellerId};
use catalog_products::{
    Page, Pagination, Product, ProductChanges, ProductFilter, ProductRecord, ProductRepository,
    RepositoryError, RepositoryResult, SortOrder, StockAdjustment,
};

use crate::config::DatabaseConfig;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        price DOUBLE PRECISION NOT NULL CHECK (price >= 0),
        stock BIGINT NOT NULL CHECK (stock >= 0),
        category TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        seller_id TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        rating DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (rating >= 0 AND rating <= 5),
        review_count BIGINT NOT NULL DEFAULT 0 CHECK (review_count >= 0),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_seller_id_idx ON products (seller_id)",
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (lower(category))",
    "CREATE INDEX IF NOT EXISTS products_featured_idx ON products (review_count DESC, rating DESC) WHERE is_active",
];

const COLUMNS: &str = "id, name, description, price, stock, category, tags, seller_id, \
                       is_active, rating, review_count, created_at, updated_at";

// Parameters $1..$7 are bound by `FilterParams::bind`, in this order.
const FILTER_SQL: &str = r#"
    WHERE ($1::text IS NULL
            OR name ILIKE $1
            OR description ILIKE $1
            OR EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE t.tag ILIKE $1))
        AND ($2::text IS NULL OR lower(category) = lower($2))
        AND ($3::text IS NULL OR seller_id = $3)
        AND ($4::float8 IS NULL OR price >= $4)
        AND ($5::float8 IS NULL OR price <= $5)
        AND ($6::bool IS NULL OR is_active = $6)
        AND (cardinality($7::text[]) = 0
            OR EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE lower(t.tag) = ANY($7)))
"#;

/// Owned bind values for `FILTER_SQL`.
#[derive(Debug, Clone)]
struct FilterParams {
    search: Option<String>,
    category: Option<String>,
    seller_id: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    is_active: Option<bool>,
    tags: Vec<String>,
}

impl FilterParams {
    fn from_filter(filter: &ProductFilter) -> Self {
        Self {
            search: filter
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("%{}%", escape_like(s))),
            category: filter.category.as_deref().map(|c| c.trim().to_string()),
            seller_id: filter.seller_id.as_ref().map(|s| s.as_str().to_string()),
            min_price: filter.min_price,
            max_price: filter.max_price,
            is_active: filter.is_active,
            tags: filter.tags.iter().map(|t| t.trim().to_lowercase()).collect(),
        }
    }

    fn bind<'q>(self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        query
            .bind(self.search)
            .bind(self.category)
            .bind(self.seller_id)
            .bind(self.min_price)
            .bind(self.max_price)
            .bind(self.is_active)
            .bind(self.tags)
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Postgres-backed product repository.
///
/// Uses the SQLx connection pool, which is `Send + Sync`, so the repository can be
/// shared across tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PostgresProductRepository {
    pool: Arc<PgPool>,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool for the given database settings.
    pub async fn connect(config: &DatabaseConfig) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `products` table and its indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> RepositoryResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn write_row(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>> {
        let record = product.to_record();
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                price = $4,
                stock = $5,
                category = $6,
                tags = $7,
                seller_id = $8,
                is_active = $9,
                rating = $10,
                review_count = $11,
                updated_at = $12
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(record.name)
        .bind(record.description)
        .bind(record.price)
        .bind(record.stock)
        .bind(record.category)
        .bind(record.tags)
        .bind(record.seller_id.into_inner())
        .bind(record.is_active)
        .bind(record.rating)
        .bind(i64::from(record.review_count))
        .bind(record.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn find_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    #[instrument(skip(self, filter, pagination), fields(page = pagination.page), err)]
    async fn find_all(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        let params = FilterParams::from_filter(filter);

        let count_sql = format!("SELECT COUNT(*) AS total FROM products {FILTER_SQL}");
        let total: i64 = params
            .clone()
            .bind(sqlx::query(&count_sql))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?
            .try_get("total")
            .map_err(|e| RepositoryError::Corrupt(format!("failed to read count: {e}")))?;

        let direction = match pagination.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        // Sort keys come from a closed enum, never from caller text.
        let order_by = pagination
            .sort_by
            .sql_keys()
            .iter()
            .map(|key| format!("{key} {direction}"))
            .collect::<Vec<_>>()
            .join(", ");
        let page_sql = format!(
            r#"SELECT {COLUMNS} FROM products {FILTER_SQL} ORDER BY {order_by}, id COLLATE "C" ASC LIMIT $8 OFFSET $9"#
        );
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);
        let rows = params
            .bind(sqlx::query(&page_sql))
            .bind(i64::from(pagination.page_size))
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(Page::new(items, pagination, total.max(0) as u64))
    }

    #[instrument(skip(self, product), fields(seller_id = %product.seller_id()), err)]
    async fn save(&self, product: &Product) -> RepositoryResult<Product> {
        let id = ProductId::generate();
        let record = product.to_record();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(record.name)
        .bind(record.description)
        .bind(record.price)
        .bind(record.stock)
        .bind(record.category)
        .bind(record.tags)
        .bind(record.seller_id.into_inner())
        .bind(record.is_active)
        .bind(record.rating)
        .bind(i64::from(record.review_count))
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save", e))?;

        product_from_row(&row)
    }

    #[instrument(skip(self, id, product), fields(product_id = %id), err)]
    async fn update(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>> {
        self.write_row(id, product).await
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn soft_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = GREATEST(updated_at, $2) WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn hard_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("hard_delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &ProductFilter) -> RepositoryResult<u64> {
        let sql = format!("SELECT COUNT(*) AS total FROM products {FILTER_SQL}");
        let total: i64 = FilterParams::from_filter(filter)
            .bind(sqlx::query(&sql))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?
            .try_get("total")
            .map_err(|e| RepositoryError::Corrupt(format!("failed to read count: {e}")))?;
        Ok(total.max(0) as u64)
    }

    async fn exists(&self, id: &ProductId) -> RepositoryResult<bool> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1) AS found")
            .bind(id.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?
            .try_get("found")
            .map_err(|e| RepositoryError::Corrupt(format!("failed to read exists: {e}")))
    }

    #[instrument(skip(self, ids, changes), fields(count = ids.len()), err)]
    async fn bulk_update(&self, ids: &[ProductId], changes: &ProductChanges) -> RepositoryResult<u64> {
        let select_sql = format!("SELECT {COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let mut modified = 0;

        for id in ids {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("bulk_update", e))?;

            let row = sqlx::query(&select_sql)
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("bulk_update", e))?;
            let Some(row) = row else {
                continue;
            };

            let updated = match product_from_row(&row)?.update(changes) {
                Ok(updated) => updated,
                Err(err) => {
                    tracing::debug!(product_id = %id, error = %err, "bulk update skipped record");
                    continue;
                }
            };
            let record = updated.to_record();

            sqlx::query(
                r#"
                UPDATE products SET
                    name = $2, description = $3, price = $4, stock = $5,
                    category = $6, tags = $7, is_active = $8, updated_at = $9
                WHERE id = $1
                "#,
            )
            .bind(id.as_str())
            .bind(record.name)
            .bind(record.description)
            .bind(record.price)
            .bind(record.stock)
            .bind(record.category)
            .bind(record.tags)
            .bind(record.is_active)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("bulk_update", e))?;

            tx.commit().await.map_err(|e| map_sqlx_error("bulk_update", e))?;
            modified += 1;
        }

        Ok(modified)
    }

    async fn find_featured(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM products
            WHERE is_active
            ORDER BY review_count DESC, rating DESC, created_at DESC, id COLLATE "C" ASC
            LIMIT $1
            "#
        ))
        .bind(i64::from(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_featured", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn adjust_stock(&self, id: &ProductId, delta: i64) -> RepositoryResult<StockAdjustment> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = GREATEST(updated_at, $3)
            WHERE id = $1
                AND stock::numeric + $2::numeric BETWEEN 0 AND 9223372036854775807
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        if let Some(row) = row {
            return Ok(StockAdjustment::Applied(product_from_row(&row)?));
        }

        // Nothing matched: either the row is missing or the guard rejected the change.
        let current = sqlx::query("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        match current {
            Some(row) => {
                let available: i64 = row.try_get("stock").map_err(corrupt)?;
                match available.checked_add(delta) {
                    None => Ok(StockAdjustment::Overflow { available }),
                    Some(_) => Ok(StockAdjustment::Insufficient { available }),
                }
            }
            None => Ok(StockAdjustment::NotFound),
        }
    }
}

fn corrupt(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Corrupt(err.to_string())
}

fn product_from_row(row: &PgRow) -> RepositoryResult<Product> {
    let review_count: i64 = row.try_get("review_count").map_err(corrupt)?;
    let review_count = u32::try_from(review_count)
        .map_err(|_| RepositoryError::Corrupt(format!("review_count out of range: {review_count}")))?;

    let record = ProductRecord {
        id: Some(ProductId::new(row.try_get::<String, _>("id").map_err(corrupt)?)),
        name: row.try_get("name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        price: row.try_get("price").map_err(corrupt)?,
        stock: row.try_get("stock").map_err(corrupt)?,
        category: row.try_get("category").map_err(corrupt)?,
        tags: row.try_get::<Vec<String>, _>("tags").map_err(corrupt)?,
        seller_id: SellerId::new(row.try_get::<String, _>("seller_id").map_err(corrupt)?),
        is_active: row.try_get("is_active").map_err(corrupt)?,
        rating: row.try_get("rating").map_err(corrupt)?,
        review_count,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(corrupt)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(corrupt)?,
    };

    Ok(Product::reconstruct(record))
}

/// Map SQLx errors to `RepositoryError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            RepositoryError::Storage(format!(
                "database error in {operation} (sqlstate {code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            RepositoryError::Storage(format!("unexpected row not found in {operation}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::Corrupt(format!("{operation}: {err}"))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}
