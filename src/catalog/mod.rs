//! Catalog Module
//!
//! Storefront lookups served through the cache. The upstream catalog is
//! reached through [`CatalogSource`]; every read goes through
//! [`CacheService::with_cache`] under the shared key conventions, so the
//! invalidation helpers in [`crate::cache::invalidation`] apply to it.

pub mod facets;
pub mod models;
mod search;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{keys, CacheService, ContentClass};
use crate::error::CacheError;

pub use facets::generate_facets;
pub use models::{
    Category, CategoryQuery, Facets, Product, ProductQuery, SearchFilters, SearchResult,
};
pub use search::{SearchHistory, SearchService, DEFAULT_POPULAR_SEARCHES};

// == Source ==
/// The upstream catalog the cache sits in front of.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn product(&self, id: u64) -> anyhow::Result<Option<Product>>;

    async fn product_by_slug(&self, slug: &str) -> anyhow::Result<Option<Product>>;

    async fn products(&self, query: &ProductQuery) -> anyhow::Result<Vec<Product>>;

    async fn category(&self, id: u64) -> anyhow::Result<Option<Category>>;

    async fn categories(&self, query: &CategoryQuery) -> anyhow::Result<Vec<Category>>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Catalog source error: {0}")]
    Source(#[from] anyhow::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

// == Cached Catalog ==
/// Read-through cache over a [`CatalogSource`].
///
/// Lookups that find nothing are not cached.
pub struct CatalogCache<S> {
    cache: Arc<CacheService>,
    source: Arc<S>,
}

impl<S: CatalogSource> CatalogCache<S> {
    pub fn new(cache: Arc<CacheService>, source: Arc<S>) -> Self {
        Self { cache, source }
    }

    pub async fn product(&self, id: u64) -> Result<Product, CatalogError> {
        self.cache
            .with_cache(&keys::product(id), None, ContentClass::Product, || async {
                self.source
                    .product(id)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound(format!("Product {}", id)))
            })
            .await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        self.cache
            .with_cache(&keys::product_slug(slug), None, ContentClass::Product, || async {
                self.source
                    .product_by_slug(slug)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound(format!("Product '{}'", slug)))
            })
            .await
    }

    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let key = keys::products(query)?;
        self.cache
            .with_cache(&key, None, ContentClass::Product, || async {
                Ok::<_, CatalogError>(self.source.products(query).await?)
            })
            .await
    }

    pub async fn category(&self, id: u64) -> Result<Category, CatalogError> {
        self.cache
            .with_cache(&keys::category(id), None, ContentClass::Category, || async {
                self.source
                    .category(id)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound(format!("Category {}", id)))
            })
            .await
    }

    /// All categories when `query` is `None`.
    pub async fn categories(&self, query: Option<&CategoryQuery>) -> Result<Vec<Category>, CatalogError> {
        let key = keys::categories(query)?;
        let query = query.cloned().unwrap_or_default();
        self.cache
            .with_cache(&key, None, ContentClass::Category, || async {
                Ok::<_, CatalogError>(self.source.categories(&query).await?)
            })
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory catalog double shared by the catalog tests.

    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct FakeCatalog {
        pub products: Mutex<Vec<Product>>,
        pub categories: Mutex<Vec<Category>>,
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
    }

    impl FakeCatalog {
        pub fn with_products(products: Vec<Product>) -> Self {
            let catalog = Self::default();
            *catalog.products.lock() = products;
            catalog
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn begin(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("catalog unavailable");
            }
            Ok(())
        }
    }

    pub fn product(id: u64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            price: "10.00".to_string(),
            average_rating: "0".to_string(),
            categories: Vec::new(),
            tags: Vec::new(),
            attributes: Vec::new(),
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn product(&self, id: u64) -> anyhow::Result<Option<Product>> {
            self.begin()?;
            Ok(self.products.lock().iter().find(|p| p.id == id).cloned())
        }

        async fn product_by_slug(&self, slug: &str) -> anyhow::Result<Option<Product>> {
            self.begin()?;
            Ok(self.products.lock().iter().find(|p| p.slug == slug).cloned())
        }

        async fn products(&self, query: &ProductQuery) -> anyhow::Result<Vec<Product>> {
            self.begin()?;
            let needle = query.search.as_deref().unwrap_or("").to_lowercase();
            let limit = query.per_page.unwrap_or(10) as usize;
            Ok(self
                .products
                .lock()
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn category(&self, id: u64) -> anyhow::Result<Option<Category>> {
            self.begin()?;
            Ok(self.categories.lock().iter().find(|c| c.id == id).cloned())
        }

        async fn categories(&self, query: &CategoryQuery) -> anyhow::Result<Vec<Category>> {
            self.begin()?;
            let needle = query.search.as_deref().unwrap_or("").to_lowercase();
            let limit = query.per_page.unwrap_or(100) as usize;
            Ok(self
                .categories
                .lock()
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&needle))
                .take(limit)
                .cloned()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{product, FakeCatalog};
    use super::*;
    use crate::cache::invalidate_product_cache;
    use std::sync::atomic::Ordering;

    fn catalog(products: Vec<Product>) -> (Arc<CacheService>, Arc<FakeCatalog>, CatalogCache<FakeCatalog>) {
        let cache = Arc::new(CacheService::in_memory(100));
        let source = Arc::new(FakeCatalog::with_products(products));
        let catalog = CatalogCache::new(cache.clone(), source.clone());
        (cache, source, catalog)
    }

    #[tokio::test]
    async fn test_product_is_fetched_once() {
        let (_, source, catalog) = catalog(vec![product(1, "Blue Mug")]);

        assert_eq!(catalog.product(1).await.unwrap().name, "Blue Mug");
        assert_eq!(catalog.product(1).await.unwrap().name, "Blue Mug");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_cached() {
        let (cache, source, catalog) = catalog(Vec::new());

        assert!(matches!(catalog.product(9).await, Err(CatalogError::NotFound(_))));
        assert!(!cache.exists(&keys::product(9)).await);

        source.products.lock().push(product(9, "Late Arrival"));
        assert_eq!(catalog.product(9).await.unwrap().id, 9);
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let (_, source, catalog) = catalog(vec![product(1, "Mug")]);
        source.failing.store(true, Ordering::SeqCst);

        assert!(matches!(catalog.product(1).await, Err(CatalogError::Source(_))));
        assert!(matches!(
            catalog.products(&ProductQuery::default()).await,
            Err(CatalogError::Source(_))
        ));
    }

    #[tokio::test]
    async fn test_product_by_slug() {
        let (cache, _, catalog) = catalog(vec![product(3, "Tea Pot")]);

        assert_eq!(catalog.product_by_slug("tea-pot").await.unwrap().id, 3);
        assert!(cache.exists(&keys::product_slug("tea-pot")).await);
    }

    #[tokio::test]
    async fn test_product_lists_refetched_after_invalidation() {
        let (cache, source, catalog) = catalog(vec![product(1, "Mug"), product(2, "Plate")]);
        let query = ProductQuery {
            per_page: Some(10),
            ..ProductQuery::default()
        };

        assert_eq!(catalog.products(&query).await.unwrap().len(), 2);
        assert_eq!(catalog.products(&query).await.unwrap().len(), 2);
        assert_eq!(source.calls(), 1);

        source.products.lock().retain(|p| p.id != 2);
        invalidate_product_cache(&cache, 2, Some("plate")).await;

        assert_eq!(catalog.products(&query).await.unwrap().len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_categories_use_category_ttl() {
        let (cache, source, catalog) = catalog(Vec::new());
        source.categories.lock().push(Category {
            id: 4,
            name: "Kitchen".to_string(),
            slug: "kitchen".to_string(),
            parent: 0,
            count: 12,
        });

        assert_eq!(catalog.categories(None).await.unwrap().len(), 1);
        assert_eq!(catalog.category(4).await.unwrap().name, "Kitchen");

        let ttl = cache.ttl("categories").await.unwrap();
        assert!(ttl > ContentClass::Product.ttl());
        assert!(cache.exists(&keys::category(4)).await);
    }
}
