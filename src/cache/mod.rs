//! Cache Module
//!
//! The cache service, its in-process fallback store, key conventions and
//! invalidation helpers.

mod content;
mod entry;
pub mod invalidation;
pub mod keys;
mod lru;
mod service;
mod stats;
mod store;


// Re-export public types
pub use content::{
    BackendHealth, CacheItem, ContentClass, HealthStatus, Increment, DEFAULT_TTL, MAX_TTL,
};
pub use entry::{CacheEntry, StoredValue};
pub use invalidation::{
    invalidate_cart_cache, invalidate_product_cache, invalidate_search_cache,
    invalidate_user_cache,
};
pub use lru::LruTracker;
pub use service::CacheService;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::MemoryStore;
