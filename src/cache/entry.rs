//! Cache Entry Module
//!
//! Defines the in-process fallback store's entries and their expiry rules.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::cache::MAX_TTL;
use crate::error::Result;

// == Stored Value ==
/// What the fallback store holds for a key.
///
/// Values are normally kept as JSON so that reads behave exactly like reads
/// from the durable backend. A value that cannot be encoded is kept as-is,
/// since the fallback store never hands it across a process boundary.
#[derive(Clone)]
pub enum StoredValue {
    Json(serde_json::Value),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl StoredValue {
    /// Decodes the stored value as `T`.
    ///
    /// Returns `Ok(None)` when an opaque value was stored under a different type.
    pub fn decode<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        match self {
            StoredValue::Json(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            StoredValue::Opaque(raw) => Ok(raw.downcast_ref::<T>().cloned()),
        }
    }

    /// Integer view used by the best-effort increment.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoredValue::Json(value) => value.as_i64(),
            StoredValue::Opaque(raw) => raw.downcast_ref::<i64>().copied(),
        }
    }
}

impl fmt::Debug for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
            StoredValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

// == Cache Entry ==
/// A single fallback store entry with its expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: StoredValue,
    /// When the entry was written
    pub created_at: Instant,
    /// When the entry stops being visible
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now, capped at [`MAX_TTL`].
    pub fn new(value: StoredValue, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_TTL))
            .unwrap_or_else(|| now + Duration::from_secs(24 * 60 * 60));

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry stays visible up to and including its expiry instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
    struct NotJson(u32);

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new(StoredValue::Json(json!("v")), Duration::from_secs(1));
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining() {
        let entry = CacheEntry::new(StoredValue::Json(json!(1)), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(entry.ttl_remaining(), Duration::from_secs(6));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(StoredValue::Json(json!(null)), Duration::ZERO);
        assert!(!entry.is_expired_at(entry.expires_at), "Entry should be visible at its expiry instant");
        assert!(entry.is_expired_at(entry.expires_at + Duration::from_nanos(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let entry = CacheEntry::new(StoredValue::Json(json!(1)), Duration::from_secs(u64::MAX));

        assert!(!entry.is_expired());
        assert_eq!(entry.ttl_remaining(), MAX_TTL);
    }

    #[test]
    fn test_decode_json() {
        let stored = StoredValue::Json(json!({"id": 7}));
        let value: Option<serde_json::Value> = stored.decode().unwrap();
        assert_eq!(value, Some(json!({"id": 7})));

        let wrong: Result<Option<String>> = stored.decode();
        assert!(wrong.is_err());
    }

    #[test]
    fn test_decode_opaque() {
        let stored = StoredValue::Opaque(Arc::new(NotJson(3)));
        assert_eq!(stored.decode::<NotJson>().unwrap(), Some(NotJson(3)));
        assert_eq!(stored.decode::<String>().unwrap(), None);
        assert_eq!(stored.as_i64(), None);
    }
}
