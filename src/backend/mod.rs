//! Backend Module
//!
//! Adapter trait for the durable, shared key-value store the cache prefers,
//! plus the connection state every adapter reports.
//!
//! Adapters deal only in JSON strings; encoding, decoding and falling back to
//! the in-process store are the [`CacheService`](crate::cache::CacheService)'s job.

mod redis_backend;

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use redis_backend::RedisBackend;

// == Connection State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Atomically updated [`ConnectionState`], readable without awaiting.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `state` and returns the previous one.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

// == Batch Write ==
/// One already-encoded write inside a pipelined batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWrite {
    pub key: String,
    pub value: String,
    pub ttl: Duration,
}

// == Cache Backend Trait ==
/// A durable key-value store reachable over the network.
///
/// Data operations must fail fast with
/// [`CacheError::BackendUnavailable`](crate::error::CacheError::BackendUnavailable)
/// while the adapter is not [`ConnectionState::Connected`], and must never wait
/// longer than the adapter's operation deadline.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Attempts to (re)establish the connection.
    async fn connect(&self) -> Result<()>;

    /// Drops the connection; the adapter reports `Disconnected` afterwards.
    async fn disconnect(&self);

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` with an expiry of `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Deletes every key starting with `prefix`; returns the count removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime; `None` when the key is absent or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Atomic integer increment; returns the new value.
    async fn increment(&self, key: &str, amount: i64) -> Result<i64>;

    /// Writes every item in a single round trip.
    async fn set_many(&self, items: &[BatchWrite]) -> Result<()>;

    /// Reads every key in a single round trip, preserving order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Removes every key in the backend's keyspace.
    async fn clear(&self) -> Result<()>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_transitions() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), ConnectionState::Disconnected);

        assert_eq!(cell.set(ConnectionState::Connecting), ConnectionState::Disconnected);
        assert_eq!(cell.set(ConnectionState::Connected), ConnectionState::Connecting);
        assert_eq!(cell.get(), ConnectionState::Connected);
    }
}
