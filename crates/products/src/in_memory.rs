use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use catalog_core::ProductId;

use crate::product::{Product, ProductChanges};
use crate::query::{Page, Pagination, ProductFilter};
use crate::repository::{ProductRepository, RepositoryError, RepositoryResult, StockAdjustment};

/// In-memory product repository.
///
/// Intended for tests/dev. Not optimized for performance: every query scans the
/// whole catalog. All mutations happen under a single write lock, so
/// `adjust_stock` and per-record `bulk_update` are atomic.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<ProductId, Product>>> {
        self.products.read().map_err(|_| RepositoryError::LockPoisoned)
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<ProductId, Product>>> {
        self.products.write().map_err(|_| RepositoryError::LockPoisoned)
    }

    fn matching(&self, filter: &ProductFilter) -> RepositoryResult<Vec<Product>> {
        let map = self.read()?;
        Ok(map.values().filter(|p| filter.matches(p)).cloned().collect())
    }
}

// Ties fall back to the identifier so pages never overlap.
fn by_id(a: &Product, b: &Product) -> std::cmp::Ordering {
    a.id().cmp(&b.id())
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        let map = self.read()?;
        Ok(map.get(id).cloned())
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> RepositoryResult<Page<Product>> {
        let mut items = self.matching(filter)?;
        items.sort_by(|a, b| pagination.compare(a, b).then_with(|| by_id(a, b)));

        let total = items.len() as u64;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let page_size = pagination.page_size as usize;
        let items = items.into_iter().skip(offset).take(page_size).collect();

        Ok(Page::new(items, pagination, total))
    }

    async fn save(&self, product: &Product) -> RepositoryResult<Product> {
        let id = ProductId::generate();
        let saved = product.clone().with_id(id.clone());

        let mut map = self.write()?;
        map.insert(id, saved.clone());
        Ok(saved)
    }

    async fn update(&self, id: &ProductId, product: &Product) -> RepositoryResult<Option<Product>> {
        let mut map = self.write()?;
        match map.get_mut(id) {
            Some(slot) => {
                let updated = product.clone().with_id(id.clone());
                *slot = updated.clone();
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        let mut map = self.write()?;
        match map.get_mut(id) {
            Some(slot) => {
                *slot = slot.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hard_delete(&self, id: &ProductId) -> RepositoryResult<bool> {
        let mut map = self.write()?;
        Ok(map.remove(id).is_some())
    }

    async fn count(&self, filter: &ProductFilter) -> RepositoryResult<u64> {
        let map = self.read()?;
        Ok(map.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn exists(&self, id: &ProductId) -> RepositoryResult<bool> {
        let map = self.read()?;
        Ok(map.contains_key(id))
    }

    async fn bulk_update(&self, ids: &[ProductId], changes: &ProductChanges) -> RepositoryResult<u64> {
        let mut map = self.write()?;
        let mut modified = 0;
        for id in ids {
            let Some(slot) = map.get_mut(id) else {
                continue;
            };
            match slot.update(changes) {
                Ok(updated) => {
                    *slot = updated;
                    modified += 1;
                }
                Err(err) => {
                    tracing::debug!(product_id = %id, error = %err, "bulk update skipped record");
                }
            }
        }
        Ok(modified)
    }

    async fn find_featured(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        let filter = ProductFilter {
            is_active: Some(true),
            ..Default::default()
        };
        let mut items = self.matching(&filter)?;
        items.sort_by(|a, b| {
            b.review_count()
                .cmp(&a.review_count())
                .then_with(|| b.rating().total_cmp(&a.rating()))
                .then_with(|| b.created_at().cmp(&a.created_at()))
                .then_with(|| by_id(a, b))
        });
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn adjust_stock(&self, id: &ProductId, delta: i64) -> RepositoryResult<StockAdjustment> {
        let mut map = self.write()?;
        let Some(slot) = map.get_mut(id) else {
            return Ok(StockAdjustment::NotFound);
        };
        let available = slot.stock();
        match available.checked_add(delta) {
            None => Ok(StockAdjustment::Overflow { available }),
            Some(next) if next < 0 => Ok(StockAdjustment::Insufficient { available }),
            Some(_) => {
                let updated = slot
                    .adjust_stock(delta)
                    .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
                *slot = updated.clone();
                Ok(StockAdjustment::Applied(updated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use crate::query::{SortField, SortOrder};
    use catalog_core::SellerId;

    fn new_product(name: &str, category: &str, seller: &str, price: f64) -> Product {
        Product::create(NewProduct {
            name: name.to_string(),
            description: "A product used in repository tests".to_string(),
            price,
            stock: 10,
            category: category.to_string(),
            tags: vec!["test".to_string()],
            seller_id: seller.to_string(),
            is_active: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn save_assigns_identity_and_find_by_id_returns_it() {
        let repo = InMemoryProductRepository::new();
        let saved = repo.save(&new_product("Laptop", "Electronics", "s1", 10.0)).await.unwrap();

        let id = saved.id().cloned().unwrap();
        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(saved));
        assert!(repo.exists(&id).await.unwrap());
        assert_eq!(repo.find_by_id(&ProductId::new("missing")).await.unwrap(), None);
    }

    #[test]
    fn len_reports_a_poisoned_lock() {
        let repo = std::sync::Arc::new(InMemoryProductRepository::new());
        let holder = repo.clone();
        let poisoned = std::thread::spawn(move || {
            let _guard = holder.products.write().unwrap();
            panic!("poison the catalog lock");
        })
        .join();
        assert!(poisoned.is_err());

        assert!(matches!(repo.len(), Err(RepositoryError::LockPoisoned)));
        assert!(matches!(repo.is_empty(), Err(RepositoryError::LockPoisoned)));
    }

    #[tokio::test]
    async fn update_returns_none_for_unknown_id() {
        let repo = InMemoryProductRepository::new();
        let product = new_product("Laptop", "Electronics", "s1", 10.0);
        assert_eq!(repo.update(&ProductId::new("missing"), &product).await.unwrap(), None);
    }

    #[tokio::test]
    async fn soft_and_hard_delete() {
        let repo = InMemoryProductRepository::new();
        let saved = repo.save(&new_product("Laptop", "Electronics", "s1", 10.0)).await.unwrap();
        let id = saved.id().cloned().unwrap();

        assert!(repo.soft_delete(&id).await.unwrap());
        assert!(!repo.find_by_id(&id).await.unwrap().unwrap().is_active());

        assert!(repo.hard_delete(&id).await.unwrap());
        assert!(!repo.exists(&id).await.unwrap());
        assert!(!repo.hard_delete(&id).await.unwrap());
        assert!(!repo.soft_delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn find_all_filters_sorts_and_pages() {
        let repo = InMemoryProductRepository::new();
        for (name, price) in [("Alpha", 30.0), ("Bravo", 10.0), ("Charlie", 20.0)] {
            repo.save(&new_product(name, "Electronics", "s1", price)).await.unwrap();
        }
        repo.save(&new_product("Delta", "Computers", "s2", 5.0)).await.unwrap();

        let pagination = Pagination::new(1, 2).sorted_by(SortField::Price, SortOrder::Asc);
        let filter = ProductFilter {
            category: Some("electronics".to_string()),
            ..Default::default()
        };
        let page = repo.find_all(&filter, &pagination).await.unwrap();

        let names: Vec<_> = page.items.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["Bravo", "Charlie"]);
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);

        let by_seller = repo.find_by_seller(&SellerId::new("s2"), &Pagination::default()).await.unwrap();
        assert_eq!(by_seller.items.len(), 1);
        let by_category = repo.find_by_category("COMPUTERS", &Pagination::default()).await.unwrap();
        assert_eq!(by_category.items[0].name(), "Delta");
        let searched = repo.search("char", &Pagination::default()).await.unwrap();
        assert_eq!(searched.meta.total, 1);
        assert_eq!(repo.count(&ProductFilter::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn bulk_update_counts_only_modified_records() {
        let repo = InMemoryProductRepository::new();
        let a = repo.save(&new_product("Alpha", "Electronics", "s1", 1.0)).await.unwrap();
        let b = repo.save(&new_product("Bravo", "Electronics", "s1", 2.0)).await.unwrap();
        let ids = vec![
            a.id().cloned().unwrap(),
            b.id().cloned().unwrap(),
            ProductId::new("missing"),
        ];

        let changes = ProductChanges {
            category: Some("Sale".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.bulk_update(&ids, &changes).await.unwrap(), 2);

        let invalid = ProductChanges {
            price: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(repo.bulk_update(&ids, &invalid).await.unwrap(), 0);
        let stored = repo.find_by_id(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.category(), "Sale");
        assert_eq!(stored.price(), 1.0);
    }

    #[tokio::test]
    async fn featured_ranks_by_reviews_then_rating_and_skips_inactive() {
        let repo = InMemoryProductRepository::new();
        let few = new_product("Few", "Electronics", "s1", 1.0).update_rating(5.0, 2).unwrap();
        let many_low = new_product("ManyLow", "Electronics", "s1", 1.0).update_rating(3.0, 40).unwrap();
        let many_high = new_product("ManyHigh", "Electronics", "s1", 1.0).update_rating(4.5, 40).unwrap();
        let hidden = new_product("Hidden", "Electronics", "s1", 1.0)
            .update_rating(5.0, 999)
            .unwrap()
            .deactivate();
        for p in [&few, &many_low, &many_high, &hidden] {
            repo.save(p).await.unwrap();
        }

        let featured = repo.find_featured(2).await.unwrap();
        let names: Vec<_> = featured.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["ManyHigh", "ManyLow"]);
    }

    #[tokio::test]
    async fn adjust_stock_is_conditional() {
        let repo = InMemoryProductRepository::new();
        let saved = repo.save(&new_product("Laptop", "Electronics", "s1", 1.0)).await.unwrap();
        let id = saved.id().cloned().unwrap();

        match repo.adjust_stock(&id, -4).await.unwrap() {
            StockAdjustment::Applied(p) => assert_eq!(p.stock(), 6),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(
            repo.adjust_stock(&id, -7).await.unwrap(),
            StockAdjustment::Insufficient { available: 6 }
        );
        assert_eq!(
            repo.adjust_stock(&id, i64::MAX).await.unwrap(),
            StockAdjustment::Overflow { available: 6 }
        );
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().stock(), 6);
        assert_eq!(
            repo.adjust_stock(&ProductId::new("missing"), 1).await.unwrap(),
            StockAdjustment::NotFound
        );
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        use std::sync::Arc;

        let repo = Arc::new(InMemoryProductRepository::new());
        let saved = repo.save(&new_product("Laptop", "Electronics", "s1", 1.0)).await.unwrap();
        let id = saved.id().cloned().unwrap();

        let mut handles = Vec::new();
        for _ in 0..25 {
            let repo = repo.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { repo.adjust_stock(&id, -1).await.unwrap() }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), StockAdjustment::Applied(_)) {
                applied += 1;
            }
        }
        assert_eq!(applied, 10);
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().stock(), 0);
    }
}
