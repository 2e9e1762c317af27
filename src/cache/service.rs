//! Cache Service Module
//!
//! The cache callers talk to. Every operation prefers the durable backend
//! while it is connected and silently degrades to the in-process store when it
//! is not, or when a call to it fails. Callers never see backend errors; only
//! [`CacheService::health_check`] reports them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{BatchWrite, CacheBackend, ConnectionState, RedisBackend};
use crate::cache::{
    BackendHealth, CacheItem, CacheStats, ContentClass, Increment, MemoryStore, StatsSnapshot,
    StoredValue, DEFAULT_TTL,
};
use crate::config::Config;
use crate::error::CacheError;

// == Cache Service ==
/// Key/value cache with a durable primary and an in-process fallback.
///
/// Construct one per process and share it behind an `Arc`.
pub struct CacheService {
    durable: Option<Arc<dyn CacheBackend>>,
    memory: Mutex<MemoryStore>,
    stats: CacheStats,
}

impl CacheService {
    // == Constructors ==
    pub fn new(durable: Option<Arc<dyn CacheBackend>>, max_entries: usize) -> Self {
        Self {
            durable,
            memory: Mutex::new(MemoryStore::new(max_entries)),
            stats: CacheStats::new(),
        }
    }

    /// A cache with no durable backend at all.
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(None, max_entries)
    }

    /// Builds the cache selected by configuration.
    ///
    /// With Redis enabled one connection attempt is made; failing it is not an
    /// error, the cache just starts on its fallback store.
    pub async fn from_config(config: &Config) -> crate::error::Result<Self> {
        let durable: Option<Arc<dyn CacheBackend>> = if config.redis_enabled {
            Some(Arc::new(RedisBackend::connect_from_config(config).await?))
        } else {
            info!("Redis disabled, using in-memory cache");
            None
        };

        Ok(Self::new(durable, config.max_entries))
    }

    // == Backend State ==
    pub fn has_durable_backend(&self) -> bool {
        self.durable.is_some()
    }

    /// True while requests are being served by the durable backend.
    pub fn is_durable_active(&self) -> bool {
        self.active_backend().is_some()
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.durable.as_ref().map(|backend| backend.state())
    }

    fn active_backend(&self) -> Option<&dyn CacheBackend> {
        self.durable
            .as_deref()
            .filter(|backend| backend.is_connected())
    }

    fn backend_failed(&self, op: &str, key: &str, err: &CacheError) {
        self.stats.record_backend_error();
        warn!("Cache {} failed for '{}', using in-memory fallback: {}", op, key, err);
    }

    fn note_fallback(&self) {
        if self.durable.is_some() {
            self.stats.record_fallback();
        }
    }

    /// Removes a durable copy that a memory-only write has superseded.
    async fn discard_durable(&self, key: &str) {
        if let Some(backend) = self.active_backend() {
            if let Err(e) = backend.delete(key).await {
                self.backend_failed("delete", key, &e);
            }
        }
    }

    fn memory_set(&self, key: &str, value: StoredValue, ttl: Duration) {
        let evicted = self.memory.lock().set(key, value, ttl);
        if evicted > 0 {
            self.stats.record_evictions(evicted);
        }
    }

    fn memory_get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        let stored = self.memory.lock().get(key)?;
        match stored.decode::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!("Cached value for '{}' could not be decoded: {}", key, e);
                None
            }
        }
    }

    fn record_lookup<T>(&self, key: &str, value: &Option<T>) {
        if value.is_some() {
            self.stats.record_hit();
            debug!("Cache hit for key '{}'", key);
        } else {
            self.stats.record_miss();
            debug!("Cache miss for key '{}'", key);
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// A value that cannot be JSON-encoded is kept in the in-process store only,
    /// and any durable copy of `key` is deleted.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        let encoded = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Value for '{}' is not JSON-encodable, caching in memory only: {}", key, e);
                self.memory_set(key, StoredValue::Opaque(Arc::new(value.clone())), ttl);
                self.discard_durable(key).await;
                return;
            }
        };

        if let Some(backend) = self.active_backend() {
            match backend.set(key, &encoded.to_string(), ttl).await {
                Ok(()) => {
                    // Drop any copy written during an outage so it can't resurface
                    self.memory.lock().remove(key);
                    return;
                }
                Err(e) => self.backend_failed("set", key, &e),
            }
        }

        self.note_fallback();
        self.memory_set(key, StoredValue::Json(encoded), ttl);
    }

    // == Smart Set ==
    /// Stores `value` with the default TTL of its content class.
    pub async fn smart_set<T>(&self, key: &str, value: &T, class: ContentClass)
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        self.set(key, value, class.ttl()).await
    }

    // == Get ==
    /// Returns the live value under `key`, or `None` if absent, expired or
    /// not decodable as `T`.
    ///
    /// The durable backend is asked first, but a live in-process entry wins
    /// over its answer: a durable write always drops the in-process copy, so
    /// an entry there was written later, while the backend was unreachable.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        let mut durable_value = None;

        if let Some(backend) = self.active_backend() {
            match backend.get(key).await {
                Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => durable_value = Some(value),
                    Err(e) => warn!("Durable value for '{}' could not be decoded: {}", key, e),
                },
                Ok(None) => {}
                Err(e) => {
                    self.backend_failed("get", key, &e);
                    self.note_fallback();
                }
            }
        } else {
            self.note_fallback();
        }

        let value = self.memory_get(key).or(durable_value);
        self.record_lookup(key, &value);
        value
    }

    // == Delete ==
    /// Removes `key` from both stores. Deleting a missing key is a no-op.
    ///
    /// Returns whether either store held the key.
    pub async fn delete(&self, key: &str) -> bool {
        let mut removed = false;

        if let Some(backend) = self.active_backend() {
            match backend.delete(key).await {
                Ok(existed) => removed = existed,
                Err(e) => self.backend_failed("delete", key, &e),
            }
        }

        self.memory.lock().remove(key) || removed
    }

    // == Delete Prefix ==
    /// Removes every key beginning with `prefix` from both stores.
    pub async fn delete_prefix(&self, prefix: &str) -> u64 {
        let mut removed = 0;

        if let Some(backend) = self.active_backend() {
            match backend.delete_prefix(prefix).await {
                Ok(count) => removed = count,
                Err(e) => self.backend_failed("delete_prefix", prefix, &e),
            }
        }

        removed + self.memory.lock().remove_prefix(prefix) as u64
    }

    // == Clear ==
    /// Removes every entry from both stores.
    pub async fn clear(&self) {
        if let Some(backend) = self.active_backend() {
            if let Err(e) = backend.clear().await {
                self.backend_failed("clear", "*", &e);
            }
        }

        self.memory.lock().clear();
        info!("Cache cleared");
    }

    // == Exists ==
    /// True iff a live entry exists; the value is never decoded.
    pub async fn exists(&self, key: &str) -> bool {
        if self.memory.lock().exists(key) {
            return true;
        }

        if let Some(backend) = self.active_backend() {
            match backend.exists(key).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => self.backend_failed("exists", key, &e),
            }
        }

        false
    }

    // == TTL ==
    /// Remaining lifetime of `key`, if it is live and expiring.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        if let Some(ttl) = self.memory.lock().ttl(key) {
            return Some(ttl);
        }

        let backend = self.active_backend()?;
        match backend.ttl(key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                self.backend_failed("ttl", key, &e);
                None
            }
        }
    }

    // == Increment ==
    /// Adds `amount` to the integer stored under `key`.
    ///
    /// Served atomically by the durable backend when possible. Otherwise the
    /// counter lives in this process only: concurrent processes each count
    /// separately and the value does not survive a restart. The returned tag
    /// says which guarantee applied.
    pub async fn increment(&self, key: &str, amount: i64) -> Increment {
        if let Some(backend) = self.active_backend() {
            match backend.increment(key, amount).await {
                Ok(value) => {
                    self.memory.lock().remove(key);
                    return Increment::Atomic(value);
                }
                Err(e) => self.backend_failed("increment", key, &e),
            }
        }

        self.note_fallback();
        let value = self.memory.lock().increment(key, amount, DEFAULT_TTL);
        Increment::BestEffort(value)
    }

    // == Set Multiple ==
    /// Stores every item; one pipelined round trip on the durable backend.
    ///
    /// Items that cannot be JSON-encoded are handled as in [`CacheService::set`].
    pub async fn set_multiple<T>(&self, items: Vec<CacheItem<T>>)
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        let mut batch = Vec::with_capacity(items.len());
        let mut encoded = Vec::with_capacity(items.len());
        let mut opaque = Vec::new();

        for item in items {
            let ttl = item.ttl();
            match serde_json::to_value(&item.value) {
                Ok(json) => {
                    batch.push(BatchWrite {
                        key: item.key.clone(),
                        value: json.to_string(),
                        ttl,
                    });
                    encoded.push((item.key, json, ttl));
                }
                Err(e) => {
                    warn!(
                        "Value for '{}' is not JSON-encodable, caching in memory only: {}",
                        item.key, e
                    );
                    self.memory_set(&item.key, StoredValue::Opaque(Arc::new(item.value)), ttl);
                    opaque.push(item.key);
                }
            }
        }

        for key in &opaque {
            self.discard_durable(key).await;
        }

        if encoded.is_empty() {
            return;
        }

        if let Some(backend) = self.active_backend() {
            match backend.set_many(&batch).await {
                Ok(()) => {
                    let mut memory = self.memory.lock();
                    for (key, _, _) in &encoded {
                        memory.remove(key);
                    }
                    return;
                }
                Err(e) => self.backend_failed("set_multiple", &format!("{} keys", batch.len()), &e),
            }
        }

        self.note_fallback();
        for (key, json, ttl) in encoded {
            self.memory_set(&key, StoredValue::Json(json), ttl);
        }
    }

    // == Get Multiple ==
    /// Looks up every key; one round trip on the durable backend.
    ///
    /// Live in-process entries win over durable values, as in
    /// [`CacheService::get`]. Every requested key appears in the result,
    /// `None` when absent.
    pub async fn get_multiple<T, K>(&self, keys: &[K]) -> HashMap<String, Option<T>>
    where
        T: DeserializeOwned + Clone + 'static,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.iter().map(|key| key.as_ref().to_string()).collect();
        let mut durable_values: Vec<Option<String>> = vec![None; keys.len()];

        if let Some(backend) = self.active_backend() {
            match backend.get_many(&keys).await {
                Ok(values) if values.len() == keys.len() => durable_values = values,
                Ok(values) => warn!(
                    "Durable batch read returned {} values for {} keys, ignoring",
                    values.len(),
                    keys.len()
                ),
                Err(e) => {
                    self.backend_failed("get_multiple", &format!("{} keys", keys.len()), &e);
                    self.note_fallback();
                }
            }
        } else {
            self.note_fallback();
        }

        keys.into_iter()
            .zip(durable_values)
            .map(|(key, raw)| {
                let decoded = raw.and_then(|raw| match serde_json::from_str::<T>(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Durable value for '{}' could not be decoded: {}", key, e);
                        None
                    }
                });
                let value = self.memory_get(&key).or(decoded);
                self.record_lookup(&key, &value);
                (key, value)
            })
            .collect()
    }

    // == With Cache ==
    /// Returns the cached value for `key`, or runs `producer`, caches its
    /// output and returns it.
    ///
    /// The result is stored for `ttl` when given, otherwise for the default TTL
    /// of `class`. Producer errors are returned as-is and nothing is cached.
    /// Concurrent misses on the same key each run their own producer.
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        class: ContentClass,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = producer().await?;

        match ttl {
            Some(ttl) => self.set(key, &value, ttl).await,
            None => self.smart_set(key, &value, class).await,
        }

        Ok(value)
    }

    // == Health Check ==
    /// Pings the durable backend and times the round trip. Never fails.
    pub async fn health_check(&self) -> BackendHealth {
        let Some(backend) = self.durable.as_deref() else {
            return BackendHealth::unhealthy("Durable backend not configured");
        };

        if !backend.is_connected() {
            return BackendHealth::unhealthy(format!("{} not connected", backend.name()));
        }

        let start = Instant::now();
        match backend.ping().await {
            Ok(()) => BackendHealth::healthy(start.elapsed()),
            Err(e) => BackendHealth::unhealthy(e.to_string()),
        }
    }

    // == Cleanup ==
    /// Evicts expired entries from the in-process store.
    ///
    /// Skipped while the durable backend is active, since it expires its own
    /// keys. Returns the number of entries removed.
    pub fn cleanup_memory_cache(&self) -> usize {
        if self.is_durable_active() {
            return 0;
        }

        let removed = self.memory.lock().cleanup_expired();
        if removed > 0 {
            self.stats.record_expired(removed);
        }
        removed
    }

    // == Connection Management ==
    /// Attempts to bring a disconnected durable backend back.
    ///
    /// Returns whether the durable backend is active afterwards.
    pub async fn reconnect(&self) -> bool {
        let Some(backend) = self.durable.as_deref() else {
            return false;
        };

        if backend.is_connected() {
            return true;
        }

        match backend.connect().await {
            Ok(()) => {
                info!("Durable cache backend {} reconnected", backend.name());
                true
            }
            Err(e) => {
                debug!("Durable cache backend {} still unavailable: {}", backend.name(), e);
                false
            }
        }
    }

    /// Closes the durable connection; later operations use the fallback store.
    pub async fn disconnect(&self) {
        if let Some(backend) = self.durable.as_deref() {
            backend.disconnect().await;
        }
    }

    // == Stats ==
    pub fn stats(&self) -> StatsSnapshot {
        let entries = self.memory.lock().len();
        self.stats.snapshot(entries)
    }
}
