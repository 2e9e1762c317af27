//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. Data operations on
//! [`CacheService`](crate::cache::CacheService) absorb these internally; they
//! surface only from the backend adapter, the health probe and the HTTP API.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Durable backend is not connected; callers fall back to the local store
    #[error("Durable backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Value could not be encoded to or decoded from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable backend did not answer before the deadline
    #[error("Backend operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true if the error means the backend connection itself is gone,
    /// as opposed to a single command being rejected.
    pub fn is_transport(&self) -> bool {
        match self {
            CacheError::BackendUnavailable(_) | CacheError::Timeout(_) => true,
            CacheError::Redis(err) => {
                err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || err.is_timeout()
            }
            _ => false,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::BackendUnavailable(_) | CacheError::Timeout(_) | CacheError::Redis(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_in_millis() {
        let err = CacheError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Backend operation timed out after 250ms");
    }

    #[test]
    fn test_transport_classification() {
        assert!(CacheError::BackendUnavailable("down".into()).is_transport());
        assert!(CacheError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!CacheError::NotFound("k".into()).is_transport());

        let refused = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(CacheError::Redis(refused).is_transport());
    }

    #[test]
    fn test_status_codes() {
        let resp = CacheError::NotFound("missing".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = CacheError::InvalidRequest("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = CacheError::BackendUnavailable("down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
