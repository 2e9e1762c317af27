//! Content classes, TTL policy and the small value types returned by the
//! cache service.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// TTL used by batch writes that don't specify one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Longest lifetime any entry can have; longer TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

// == Content Class ==
/// Kind of data being cached; selects the default TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Product,
    Category,
    Cart,
    User,
    #[default]
    General,
}

impl ContentClass {
    pub const ALL: [ContentClass; 5] = [
        ContentClass::Product,
        ContentClass::Category,
        ContentClass::Cart,
        ContentClass::User,
        ContentClass::General,
    ];

    /// Default lifetime for entries of this class.
    pub const fn ttl(self) -> Duration {
        match self {
            ContentClass::Product => Duration::from_secs(300),
            ContentClass::Category => Duration::from_secs(600),
            ContentClass::Cart => Duration::from_secs(60),
            ContentClass::User => Duration::from_secs(1800),
            ContentClass::General => Duration::from_secs(300),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ContentClass::Product => "product",
            ContentClass::Category => "category",
            ContentClass::Cart => "cart",
            ContentClass::User => "user",
            ContentClass::General => "general",
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentClass {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown content class: {}", s)))
    }
}

// == Increment ==
/// Result of [`CacheService::increment`](crate::cache::CacheService::increment),
/// tagged with the consistency it was served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "consistency", content = "value", rename_all = "snake_case")]
pub enum Increment {
    /// INCRBY on the durable backend; atomic across every process sharing it
    Atomic(i64),
    /// Read-modify-write on this process's fallback store. Other processes
    /// keep their own counters and the value is lost on restart.
    BestEffort(i64),
}

impl Increment {
    pub fn value(self) -> i64 {
        match self {
            Increment::Atomic(value) | Increment::BestEffort(value) => value,
        }
    }

    pub fn is_atomic(self) -> bool {
        matches!(self, Increment::Atomic(_))
    }
}

// == Batch Item ==
/// One entry of a [`set_multiple`](crate::cache::CacheService::set_multiple) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItem<T> {
    pub key: String,
    pub value: T,
    /// TTL in seconds; [`DEFAULT_TTL`] when absent
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl<T> CacheItem<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl.as_secs());
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.map(Duration::from_secs).unwrap_or(DEFAULT_TTL)
    }
}

// == Backend Health ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of a liveness probe against the durable backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendHealth {
    pub fn healthy(latency: Duration) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
