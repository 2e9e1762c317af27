//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheItem, ContentClass, MAX_TTL};

const MAX_KEY_LENGTH: usize = 512;

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

fn validate_ttl(ttl: Option<u64>) -> Option<String> {
    match ttl {
        Some(0) => Some("TTL must be at least one second".to_string()),
        Some(secs) if secs > MAX_TTL.as_secs() => Some(format!(
            "TTL exceeds maximum of {} seconds",
            MAX_TTL.as_secs()
        )),
        _ => None,
    }
}

/// Request body for PUT /set
///
/// `ttl` (seconds) wins over `class`; with neither, the general TTL applies.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    /// Any JSON document
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub class: Option<ContentClass>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key).or_else(|| validate_ttl(self.ttl))
    }
}

/// Request body for POST /incr/:key
#[derive(Debug, Clone, Deserialize)]
pub struct IncrRequest {
    #[serde(default = "default_amount")]
    pub amount: i64,
}

fn default_amount() -> i64 {
    1
}

impl Default for IncrRequest {
    fn default() -> Self {
        Self {
            amount: default_amount(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MsetItem {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for POST /mset
#[derive(Debug, Clone, Deserialize)]
pub struct MsetRequest {
    pub items: Vec<MsetItem>,
}

impl MsetRequest {
    pub fn validate(&self) -> Option<String> {
        if self.items.is_empty() {
            return Some("At least one item is required".to_string());
        }
        self.items
            .iter()
            .find_map(|item| validate_key(&item.key).or_else(|| validate_ttl(item.ttl)))
    }

    pub fn into_items(self) -> Vec<CacheItem<Value>> {
        self.items
            .into_iter()
            .map(|item| CacheItem {
                key: item.key,
                value: item.value,
                ttl: item.ttl,
            })
            .collect()
    }
}

/// Request body for POST /mget
#[derive(Debug, Clone, Deserialize)]
pub struct MgetRequest {
    pub keys: Vec<String>,
}
