//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the durable Redis backend should be used at all
    pub redis_enabled: bool,
    /// Redis host name
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Optional Redis password
    pub redis_password: Option<String>,
    /// Deadline for a single durable backend round trip, in milliseconds
    pub backend_timeout_ms: u64,
    /// Maximum number of entries the in-process fallback store can hold
    pub max_entries: usize,
    /// Fallback store sweep interval in seconds
    pub cleanup_interval: u64,
    /// Interval in seconds between reconnection probes while disconnected
    pub reconnect_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ENABLE_REDIS` - `true`/`1` to use Redis (default: false)
    /// - `REDIS_HOST` - Redis host (default: localhost)
    /// - `REDIS_PORT` - Redis port (default: 6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_TIMEOUT_MS` - Per-operation deadline (default: 500)
    /// - `MAX_ENTRIES` - Fallback store capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `RECONNECT_INTERVAL` - Reconnect probe frequency in seconds (default: 5)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            redis_enabled: env::var("ENABLE_REDIS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(defaults.redis_enabled),
            redis_host: env::var("REDIS_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_host),
            redis_port: parse_var("REDIS_PORT").unwrap_or(defaults.redis_port),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
            backend_timeout_ms: parse_var("REDIS_TIMEOUT_MS")
                .unwrap_or(defaults.backend_timeout_ms),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            reconnect_interval: parse_var("RECONNECT_INTERVAL")
                .unwrap_or(defaults.reconnect_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Deadline applied to each durable backend call.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Connection parameters for the Redis client.
    pub fn redis_connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.redis_host.clone(), self.redis_port),
            redis: redis::RedisConnectionInfo {
                password: self.redis_password.clone(),
                ..Default::default()
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_enabled: false,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_password: None,
            backend_timeout_ms: 500,
            max_entries: 10_000,
            cleanup_interval: 300,
            reconnect_interval: 5,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.redis_enabled);
        assert_eq!(config.redis_host, "localhost");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.cleanup_interval, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.backend_timeout(), Duration::from_millis(500));
    }

    // Single test touching the environment so parallel tests don't race.
    #[test]
    fn test_config_from_env() {
        for name in [
            "ENABLE_REDIS",
            "REDIS_HOST",
            "REDIS_PORT",
            "REDIS_PASSWORD",
            "REDIS_TIMEOUT_MS",
            "MAX_ENTRIES",
            "CLEANUP_INTERVAL",
            "RECONNECT_INTERVAL",
            "SERVER_PORT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert!(!config.redis_enabled);
        assert_eq!(config.redis_port, 6379);
        assert!(config.redis_password.is_none());
        assert_eq!(config.cleanup_interval, 300);

        env::set_var("ENABLE_REDIS", "TRUE");
        env::set_var("REDIS_PORT", "6380");
        env::set_var("REDIS_PASSWORD", "secret");
        env::set_var("MAX_ENTRIES", "not-a-number");

        let config = Config::from_env();
        assert!(config.redis_enabled);
        assert_eq!(config.redis_port, 6380);
        assert_eq!(config.redis_password.as_deref(), Some("secret"));
        assert_eq!(config.max_entries, 10_000);

        let info = config.redis_connection_info();
        assert_eq!(info.redis.password.as_deref(), Some("secret"));

        env::remove_var("ENABLE_REDIS");
        env::remove_var("REDIS_PORT");
        env::remove_var("REDIS_PASSWORD");
        env::remove_var("MAX_ENTRIES");
    }
}
