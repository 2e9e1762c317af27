//! Memory Store Module
//!
//! In-process fallback store: a HashMap with per-entry expiry and an LRU
//! capacity bound. It is only ever touched behind the service's mutex, so every
//! method is synchronous and leaves the map consistent when it returns.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, LruTracker, StoredValue};

// == Memory Store ==
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Recency index for capacity eviction
    lru: LruTracker,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store that holds at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_entries: max_entries.max(1),
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry and its expiry.
    ///
    /// Returns the number of entries evicted to make room.
    pub fn set(&mut self, key: &str, value: StoredValue, ttl: Duration) -> usize {
        let mut evicted = 0;

        if !self.entries.contains_key(key) {
            // Expired entries go first so live data isn't evicted needlessly
            if self.entries.len() >= self.max_entries {
                self.cleanup_expired();
            }
            while self.entries.len() >= self.max_entries {
                match self.lru.evict_oldest() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }

        self.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        self.lru.touch(key);

        evicted
    }

    // == Get ==
    /// Returns the live value for `key`, dropping it if it has expired.
    pub fn get(&mut self, key: &str) -> Option<StoredValue> {
        let entry = self.entries.get(key)?;

        if entry.is_expired() {
            self.remove(key);
            return None;
        }

        let value = entry.value.clone();
        self.lru.touch(key);
        Some(value)
    }

    // == Exists ==
    /// Checks for a live entry without cloning or decoding the value.
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == TTL ==
    /// Remaining lifetime of a live entry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(CacheEntry::ttl_remaining)
    }

    // == Increment ==
    /// Adds `amount` to the integer stored under `key`.
    ///
    /// Missing, expired or non-integer values count as zero. A live entry keeps
    /// its expiry; a new one gets `default_ttl`.
    pub fn increment(&mut self, key: &str, amount: i64, default_ttl: Duration) -> i64 {
        let now = Instant::now();
        let (current, ttl) = match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => (
                entry.value.as_i64().unwrap_or(0),
                entry.expires_at.saturating_duration_since(now),
            ),
            _ => (0, default_ttl),
        };

        let next = current.saturating_add(amount);
        self.set(key, StoredValue::Json(next.into()), ttl);
        next
    }

    // == Delete ==
    /// Removes an entry; returns whether one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    // == Delete Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            self.remove(key);
        }
        matching.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(300);

    fn json(value: serde_json::Value) -> StoredValue {
        StoredValue::Json(value)
    }

    fn read(store: &mut MemoryStore, key: &str) -> Option<serde_json::Value> {
        store
            .get(key)
            .and_then(|value| value.decode::<serde_json::Value>().unwrap())
    }

    #[test]
    fn test_set_and_get() {
        let mut store = MemoryStore::new(100);
        store.set("key1", json(json!({"a": 1})), TTL);

        assert_eq!(read(&mut store, "key1"), Some(json!({"a": 1})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let mut store = MemoryStore::new(100);
        store.set("key1", json(json!("v1")), TTL);
        store.set("key1", json(json!("v2")), TTL);

        assert_eq!(read(&mut store, "key1"), Some(json!("v2")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_drops_expired_entry() {
        let mut store = MemoryStore::new(100);
        store.set("key1", json(json!(1)), Duration::from_secs(1));

        assert!(store.exists("key1"));
        tokio::time::advance(Duration::from_millis(1100)).await;

        assert!(!store.exists("key1"));
        assert!(store.get("key1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = MemoryStore::new(100);
        store.set("key1", json(json!(1)), TTL);

        assert!(store.remove("key1"));
        assert!(!store.remove("key1"));
        assert!(!store.remove("never-set"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let mut store = MemoryStore::new(3);
        store.set("key1", json(json!(1)), TTL);
        store.set("key2", json(json!(2)), TTL);
        store.set("key3", json(json!(3)), TTL);

        // key1 becomes most recently used, so key2 is the eviction victim
        store.get("key1");
        let evicted = store.set("key4", json(json!(4)), TTL);

        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 3);
        assert!(store.exists("key1"));
        assert!(!store.exists("key2"));
        assert!(store.exists("key4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_prefers_dropping_expired() {
        let mut store = MemoryStore::new(2);
        store.set("short", json(json!(1)), Duration::from_secs(1));
        store.set("long", json(json!(2)), TTL);
        tokio::time::advance(Duration::from_secs(2)).await;

        let evicted = store.set("new", json(json!(3)), TTL);

        assert_eq!(evicted, 0);
        assert!(store.exists("long"));
        assert!(store.exists("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let mut store = MemoryStore::new(100);
        store.set("key1", json(json!(1)), Duration::from_secs(1));
        store.set("key2", json(json!(2)), Duration::from_secs(10));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.exists("key2"));
    }

    #[test]
    fn test_remove_prefix() {
        let mut store = MemoryStore::new(100);
        store.set("products:{\"page\":1}", json(json!([])), TTL);
        store.set("products:{\"page\":2}", json(json!([])), TTL);
        store.set("product:7", json(json!({})), TTL);

        assert_eq!(store.remove_prefix("products:"), 2);
        assert!(store.exists("product:7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_keeps_expiry() {
        let mut store = MemoryStore::new(100);

        assert_eq!(store.increment("views", 1, TTL), 1);
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(store.increment("views", 4, TTL), 5);

        assert_eq!(store.ttl("views"), Some(Duration::from_secs(200)));
    }

    #[test]
    fn test_increment_non_integer_counts_as_zero() {
        let mut store = MemoryStore::new(100);
        store.set("label", json(json!("text")), TTL);

        assert_eq!(store.increment("label", 2, TTL), 2);
    }
}
