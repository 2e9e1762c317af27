//! Faceted product search with cached results and suggestions.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{keys, CacheService, ContentClass};
use crate::catalog::facets::generate_facets;
use crate::catalog::models::{CategoryQuery, ProductQuery, SearchFilters, SearchResult};
use crate::catalog::CatalogSource;

pub const DEFAULT_POPULAR_SEARCHES: [&str; 8] = [
    "wireless headphones",
    "smartphone",
    "laptop",
    "bluetooth speaker",
    "fitness tracker",
    "camera",
    "tablet",
    "gaming console",
];

const SEARCH_TTL: Duration = Duration::from_secs(300);
const SUGGESTION_TTL: Duration = Duration::from_secs(600);
const HISTORY_LIMIT: usize = 10;
const MIN_QUERY_CHARS: usize = 2;
const SUGGESTION_CATEGORY_LIMIT: u32 = 5;
const SEARCH_SUGGESTION_LIMIT: usize = 10;
/// Listing size used to estimate the total hit count.
const TOTAL_PROBE_LIMIT: u32 = 100;

// == Search History ==
/// Recent queries, most recent first, without duplicates.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Records a query. Queries shorter than two characters after trimming
    /// are ignored.
    pub fn record(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return false;
        }

        self.entries.retain(|entry| entry != query);
        self.entries.push_front(query.to_string());
        self.entries.truncate(self.limit);
        true
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn remove(&mut self, query: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != query);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

// == Search Service ==
pub struct SearchService<S> {
    cache: Arc<CacheService>,
    source: Arc<S>,
    history: Mutex<SearchHistory>,
    popular: Vec<String>,
}

impl<S: CatalogSource> SearchService<S> {
    pub fn new(cache: Arc<CacheService>, source: Arc<S>) -> Self {
        Self {
            cache,
            source,
            history: Mutex::new(SearchHistory::default()),
            popular: DEFAULT_POPULAR_SEARCHES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_popular_searches(mut self, popular: Vec<String>) -> Self {
        self.popular = popular;
        self
    }

    /// Runs one page of a search, served from cache when possible.
    ///
    /// Upstream failures yield an empty result, which is not cached.
    pub async fn search(&self, filters: &SearchFilters, page: u32, per_page: u32) -> SearchResult {
        if let Some(query) = filters.query.as_deref() {
            self.history.lock().record(query);
        }

        let result = match keys::search_results(filters, page, per_page) {
            Ok(key) => {
                self.cache
                    .with_cache(&key, Some(SEARCH_TTL), ContentClass::General, || {
                        self.perform_search(filters, page, per_page)
                    })
                    .await
            }
            Err(e) => {
                warn!("Search key could not be built, searching uncached: {}", e);
                self.perform_search(filters, page, per_page).await
            }
        };

        result.unwrap_or_else(|e| {
            warn!("Search failed: {:#}", e);
            SearchResult::empty(page)
        })
    }

    async fn perform_search(
        &self,
        filters: &SearchFilters,
        page: u32,
        per_page: u32,
    ) -> anyhow::Result<SearchResult> {
        let products = self.source.products(&filters.to_query(page, per_page)).await?;
        let total = self.estimate_total(filters).await?;
        let facets = generate_facets(&products);

        let suggestions = match filters.query.as_deref() {
            Some(query) if !query.trim().is_empty() => {
                self.suggestions(query, SEARCH_SUGGESTION_LIMIT).await
            }
            _ => Vec::new(),
        };

        debug!("Search page {} matched {} products", page, products.len());
        Ok(SearchResult {
            products,
            total,
            total_pages: total.div_ceil(u64::from(per_page.max(1))),
            current_page: page,
            facets,
            suggestions,
        })
    }

    /// Exact below the probe size; beyond it the catalog is assumed to hold
    /// about twice what the probe saw.
    async fn estimate_total(&self, filters: &SearchFilters) -> anyhow::Result<u64> {
        let probe = self
            .source
            .products(&filters.to_query(1, TOTAL_PROBE_LIMIT))
            .await?;
        let found = probe.len() as u64;

        Ok(if found < u64::from(TOTAL_PROBE_LIMIT) {
            found
        } else {
            found * 2
        })
    }

    // == Suggestions ==
    /// Product and category names containing `query`.
    ///
    /// Queries shorter than two characters get the popular searches instead.
    pub async fn suggestions(&self, query: &str, limit: usize) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return self.popular_searches(limit);
        }

        let result = self
            .cache
            .with_cache(
                &keys::suggestions(query),
                Some(SUGGESTION_TTL),
                ContentClass::General,
                || self.collect_suggestions(query, limit),
            )
            .await;

        result.unwrap_or_else(|e| {
            warn!("Suggestions for '{}' failed: {:#}", query, e);
            Vec::new()
        })
    }

    async fn collect_suggestions(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        let products = self
            .source
            .products(&ProductQuery {
                search: Some(query.to_string()),
                per_page: Some(u32::try_from(limit).unwrap_or(u32::MAX)),
                status: Some("publish".to_string()),
                ..ProductQuery::default()
            })
            .await?;
        let categories = self
            .source
            .categories(&CategoryQuery {
                search: Some(query.to_string()),
                per_page: Some(SUGGESTION_CATEGORY_LIMIT),
                parent: None,
            })
            .await?;

        let needle = query.to_lowercase();
        let mut seen = HashSet::new();
        Ok(products
            .into_iter()
            .map(|product| product.name)
            .chain(categories.into_iter().map(|category| category.name))
            .filter(|name| name.to_lowercase().contains(&needle))
            .filter(|name| seen.insert(name.clone()))
            .take(limit)
            .collect())
    }

    pub fn popular_searches(&self, limit: usize) -> Vec<String> {
        self.popular.iter().take(limit).cloned().collect()
    }

    // == History ==
    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries()
    }

    pub fn remove_from_history(&self, query: &str) -> bool {
        self.history.lock().remove(query)
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::Category;
    use crate::catalog::testing::{product, FakeCatalog};
    use std::sync::atomic::Ordering;

    fn service(names: &[&str]) -> (Arc<FakeCatalog>, SearchService<FakeCatalog>) {
        let products = names
            .iter()
            .enumerate()
            .map(|(i, name)| product(i as u64 + 1, name))
            .collect();
        let source = Arc::new(FakeCatalog::with_products(products));
        let cache = Arc::new(CacheService::in_memory(100));
        (source.clone(), SearchService::new(cache, source))
    }

    fn query(text: &str) -> SearchFilters {
        SearchFilters {
            query: Some(text.to_string()),
            ..SearchFilters::default()
        }
    }

    #[test]
    fn test_history_records_recent_first() {
        let mut history = SearchHistory::new(3);

        assert!(history.record("  mug "));
        assert!(!history.record("m"));
        history.record("plate");
        history.record("mug");
        history.record("bowl");
        history.record("cup");

        assert_eq!(history.entries(), vec!["cup", "bowl", "mug"]);
        assert!(history.remove("bowl"));
        assert!(!history.remove("bowl"));
        history.clear();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_search_results_are_cached() {
        let (source, search) = service(&["Blue Mug", "Red Mug", "Plate"]);

        let first = search.search(&query("mug"), 1, 10).await;
        let calls = source.calls();
        let second = search.search(&query("mug"), 1, 10).await;

        assert_eq!(first.products.len(), 2);
        assert_eq!(first.total, 2);
        assert_eq!(first.total_pages, 1);
        assert_eq!(first, second);
        assert_eq!(source.calls(), calls);
        assert_eq!(search.history(), vec!["mug"]);
    }

    #[tokio::test]
    async fn test_total_pages_round_up() {
        let (_, search) = service(&["Mug 1", "Mug 2", "Mug 3"]);

        let result = search.search(&query("mug"), 1, 2).await;

        assert_eq!(result.products.len(), 2);
        assert_eq!(result.total, 3);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.facets.price_ranges[0].count, 2);
    }

    #[tokio::test]
    async fn test_failed_search_is_empty_and_uncached() {
        let (source, search) = service(&["Mug"]);
        source.failing.store(true, Ordering::SeqCst);

        assert_eq!(search.search(&query("mug"), 1, 10).await, SearchResult::empty(1));

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(search.search(&query("mug"), 1, 10).await.total, 1);
    }

    #[tokio::test]
    async fn test_short_query_suggests_popular_searches() {
        let (source, search) = service(&["Mug"]);

        let suggestions = search.suggestions("m", 3).await;

        assert_eq!(suggestions, vec!["wireless headphones", "smartphone", "laptop"]);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_suggestions_merge_products_and_categories() {
        let (source, search) = service(&["Blue Mug", "Blue Plate", "Green Mug"]);
        source.categories.lock().push(Category {
            id: 1,
            name: "Blue Things".to_string(),
            slug: "blue-things".to_string(),
            parent: 0,
            count: 2,
        });

        let suggestions = search.suggestions("blue", 10).await;
        let calls = source.calls();

        assert_eq!(suggestions, vec!["Blue Mug", "Blue Plate", "Blue Things"]);
        assert_eq!(search.suggestions("blue", 10).await, suggestions);
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn test_custom_popular_searches() {
        let (_, search) = service(&[]);
        let search = search.with_popular_searches(vec!["teapot".to_string()]);

        assert_eq!(search.popular_searches(5), vec!["teapot"]);
        assert_eq!(search.suggestions("", 5).await, vec!["teapot"]);
    }
}
