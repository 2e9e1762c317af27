//! Cache invalidation helpers.
//!
//! Product lists are keyed by their query parameters, so the set of lists that
//! may contain a product is open-ended. Invalidation removes them all by the
//! shared `products:` prefix (SCAN on Redis, a key filter in memory). List
//! entries also carry the short product TTL, which bounds staleness if a sweep
//! fails part-way.

use tracing::info;

use crate::cache::{keys, CacheService};

/// Drops a product's own entries and every cached product list.
///
/// Returns the number of entries removed.
pub async fn invalidate_product_cache(cache: &CacheService, product_id: u64, slug: Option<&str>) -> u64 {
    let mut removed = cache.delete_prefix(keys::PRODUCT_LIST_PREFIX).await;

    if cache.delete(&keys::product(product_id)).await {
        removed += 1;
    }
    if let Some(slug) = slug {
        if cache.delete(&keys::product_slug(slug)).await {
            removed += 1;
        }
    }

    info!("Invalidated product {} ({} cache entries)", product_id, removed);
    removed
}

pub async fn invalidate_cart_cache(cache: &CacheService, user_id: Option<u64>) -> bool {
    cache.delete(&keys::cart(user_id)).await
}

pub async fn invalidate_user_cache(cache: &CacheService, user_id: u64) -> bool {
    cache.delete(&keys::user(user_id)).await
}

/// Drops every cached search page and suggestion list.
pub async fn invalidate_search_cache(cache: &CacheService) -> u64 {
    cache.delete_prefix(keys::SEARCH_PREFIX).await + cache.delete_prefix("suggestions:").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_invalidate_product_removes_lists_and_entries() {
        let cache = CacheService::in_memory(100);
        let list_a = keys::products(&json!({"page": 1})).unwrap();
        let list_b = keys::products(&json!({"category": 4})).unwrap();

        cache.set(&keys::product(7), &json!({"id": 7}), TTL).await;
        cache.set(&keys::product_slug("mug"), &json!({"id": 7}), TTL).await;
        cache.set(&list_a, &json!([7]), TTL).await;
        cache.set(&list_b, &json!([7, 8]), TTL).await;
        cache.set(&keys::product(8), &json!({"id": 8}), TTL).await;

        let removed = invalidate_product_cache(&cache, 7, Some("mug")).await;

        assert_eq!(removed, 4);
        assert!(!cache.exists(&list_a).await);
        assert!(!cache.exists(&list_b).await);
        assert!(!cache.exists(&keys::product(7)).await);
        assert!(!cache.exists(&keys::product_slug("mug")).await);
        assert!(cache.exists(&keys::product(8)).await);
    }

    #[tokio::test]
    async fn test_invalidate_cart_and_user() {
        let cache = CacheService::in_memory(100);
        cache.set(&keys::cart(Some(3)), &json!([]), TTL).await;
        cache.set(&keys::user(3), &json!({}), TTL).await;

        assert!(invalidate_cart_cache(&cache, Some(3)).await);
        assert!(invalidate_user_cache(&cache, 3).await);
        assert!(!invalidate_user_cache(&cache, 3).await);
    }

    #[tokio::test]
    async fn test_invalidate_search_cache() {
        let cache = CacheService::in_memory(100);
        cache.set(&keys::search("mug"), &json!([]), TTL).await;
        cache.set(&keys::suggestions("mu"), &json!(["mug"]), TTL).await;
        cache.set(&keys::product(1), &json!({}), TTL).await;

        assert_eq!(invalidate_search_cache(&cache).await, 2);
        assert!(cache.exists(&keys::product(1)).await);
    }
}
