//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::backend::ConnectionState;
use crate::cache::{BackendHealth, Increment, StatsSnapshot};

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    /// Lifetime applied to the entry, in seconds
    pub ttl: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for DELETE /del/:key
///
/// Deleting a missing key still succeeds; `deleted` reports whether it existed.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        let key = key.into();
        let message = if deleted {
            format!("Key '{}' deleted successfully", key)
        } else {
            format!("Key '{}' was not cached", key)
        };
        Self {
            message,
            key,
            deleted,
        }
    }
}

/// Response body for GET /exists/:key
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
    /// Remaining lifetime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// Response body for POST /incr/:key
#[derive(Debug, Clone, Serialize)]
pub struct IncrResponse {
    pub key: String,
    pub value: i64,
    /// False when the counter was served by this process's fallback store
    pub atomic: bool,
}

impl IncrResponse {
    pub fn new(key: impl Into<String>, result: Increment) -> Self {
        Self {
            key: key.into(),
            value: result.value(),
            atomic: result.is_atomic(),
        }
    }
}

/// Response body for POST /mset
#[derive(Debug, Clone, Serialize)]
pub struct MsetResponse {
    pub count: usize,
}

/// Response body for POST /mget
#[derive(Debug, Clone, Serialize)]
pub struct MgetResponse {
    pub values: HashMap<String, Option<Value>>,
}

/// Response body for the bulk removal endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
}

impl ClearResponse {
    pub fn new(message: impl Into<String>, removed: Option<u64>) -> Self {
        Self {
            message: message.into(),
            removed,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: StatsSnapshot,
    pub durable_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionState>,
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when a configured durable backend is down
    pub status: String,
    pub durable_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendHealth>,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Health of a cache without a durable backend.
    pub fn memory_only() -> Self {
        Self {
            status: "healthy".to_string(),
            durable_enabled: false,
            connection: None,
            backend: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_backend(backend: BackendHealth, connection: Option<ConnectionState>) -> Self {
        let status = if backend.is_healthy() { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            durable_enabled: true,
            connection,
            backend: Some(backend),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_delete_response_reports_missing_key() {
        let resp = DeleteResponse::new("gone", false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"deleted\":false"));
        assert!(json.contains("not cached"));
    }

    #[test]
    fn test_incr_response_consistency() {
        let resp = IncrResponse::new("views", Increment::BestEffort(4));
        assert_eq!(resp.value, 4);
        assert!(!resp.atomic);
    }

    #[test]
    fn test_stats_response_flattens_snapshot() {
        let resp = StatsResponse {
            cache: StatsSnapshot {
                hits: 3,
                ..StatsSnapshot::default()
            },
            durable_active: false,
            connection: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["durable_active"], false);
        assert!(json.get("connection").is_none());
    }

    #[test]
    fn test_health_response_status() {
        let healthy = HealthResponse::with_backend(
            BackendHealth::healthy(Duration::from_millis(2)),
            Some(ConnectionState::Connected),
        );
        assert!(healthy.is_healthy());

        let degraded = HealthResponse::with_backend(
            BackendHealth::unhealthy("connection refused"),
            Some(ConnectionState::Disconnected),
        );
        assert_eq!(degraded.status, "degraded");

        let json = serde_json::to_string(&HealthResponse::memory_only()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
