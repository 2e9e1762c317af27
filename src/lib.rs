//! Fallback Cache - a key/value cache with a Redis primary and an
//! in-process fallback
//!
//! Callers see a single cache that keeps answering while Redis is down,
//! with per-content TTLs, batch operations and a read-through wrapper.

pub mod api;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheService, ContentClass, Increment};
pub use config::Config;
pub use error::CacheError;
pub use tasks::{spawn_cleanup_task, spawn_reconnect_task};
