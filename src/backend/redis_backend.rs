//! Redis-based durable backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, info, warn};

use super::{BatchWrite, CacheBackend, ConnectionState, StateCell};
use crate::cache::MAX_TTL;
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Keys fetched per SCAN step during prefix deletion.
const SCAN_BATCH: usize = 100;

/// Redis adapter on top of the client's auto-reconnecting connection manager.
///
/// The manager is created lazily by [`connect`](CacheBackend::connect), so a
/// Redis that is down at startup only means the cache starts on its fallback.
pub struct RedisBackend {
    client: redis::Client,
    manager: RwLock<Option<ConnectionManager>>,
    state: StateCell,
    /// Deadline for each round trip
    timeout: Duration,
}

impl RedisBackend {
    /// Creates an unconnected backend from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = redis::Client::open(config.redis_connection_info())?;

        Ok(Self {
            client,
            manager: RwLock::new(None),
            state: StateCell::default(),
            timeout: config.backend_timeout(),
        })
    }

    /// Creates the backend and makes one connection attempt.
    ///
    /// A failed attempt is logged and leaves the backend `Disconnected`.
    pub async fn connect_from_config(config: &Config) -> Result<Self> {
        let backend = Self::new(config)?;
        if let Err(e) = backend.connect().await {
            warn!(
                "Redis at {}:{} unavailable, starting on in-memory fallback: {}",
                config.redis_host, config.redis_port, e
            );
        }
        Ok(backend)
    }

    /// Returns a handle to the live connection, or fails fast.
    fn connection(&self) -> Result<ConnectionManager> {
        if self.state.get() != ConnectionState::Connected {
            return Err(CacheError::BackendUnavailable(
                "Redis not connected".to_string(),
            ));
        }

        self.manager
            .read()
            .clone()
            .ok_or_else(|| CacheError::BackendUnavailable("Redis not connected".to_string()))
    }

    /// Awaits a Redis command under the operation deadline.
    ///
    /// Transport failures flip the state to `Disconnected` so that later calls
    /// go straight to the fallback until a reconnect succeeds.
    async fn run<T, F>(&self, op: &'static str, command: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>> + Send,
        T: Send,
    {
        let err = match tokio::time::timeout(self.timeout, command).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => CacheError::Redis(e),
            Err(_) => CacheError::Timeout(self.timeout),
        };

        if err.is_transport() {
            self.mark_disconnected(op, &err);
        }
        Err(err)
    }

    fn mark_disconnected(&self, op: &str, err: &CacheError) {
        if self.state.set(ConnectionState::Disconnected) == ConnectionState::Connected {
            warn!("Redis connection lost during {}: {}", op, err);
        }
    }

    async fn establish(&self) -> Result<()> {
        let existing = self.manager.read().clone();

        let mut manager = match existing {
            Some(manager) => manager,
            None => {
                let created = tokio::time::timeout(
                    self.timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| CacheError::Timeout(self.timeout))??;
                *self.manager.write() = Some(created.clone());
                created
            }
        };

        let _: String = tokio::time::timeout(
            self.timeout,
            redis::cmd("PING").query_async::<String>(&mut manager),
        )
        .await
        .map_err(|_| CacheError::Timeout(self.timeout))??;

        Ok(())
    }
}

/// Escapes Redis glob metacharacters so a prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Millisecond expiry for SET PX, capped at [`MAX_TTL`]; Redis rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.min(MAX_TTL).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    async fn connect(&self) -> Result<()> {
        self.state.set(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.state.set(ConnectionState::Connected);
                info!("Redis connected successfully");
                Ok(())
            }
            Err(e) => {
                // A manager that can't answer is rebuilt on the next attempt
                *self.manager.write() = None;
                self.state.set(ConnectionState::Disconnected);
                debug!("Redis connection attempt failed: {}", e);
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        *self.manager.write() = None;
        if self.state.set(ConnectionState::Disconnected) != ConnectionState::Disconnected {
            info!("Redis connection closed");
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        let value: Option<String> = self.run("get", conn.get(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("PX").arg(ttl_millis(ttl));

        self.run("set", cmd.query_async::<()>(&mut conn)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let deleted: i64 = self.run("del", conn.del(key)).await?;
        Ok(deleted > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.connection()?;
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .run(
                    "scan",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self.run("del", conn.del(&keys)).await?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!("Deleted {} Redis keys with prefix '{}'", deleted, prefix);
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let exists: bool = self.run("exists", conn.exists(key)).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.connection()?;
        let millis: i64 = self
            .run("pttl", redis::cmd("PTTL").arg(key).query_async(&mut conn))
            .await?;

        // -2: missing key, -1: no expiry
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        let mut conn = self.connection()?;
        let value: i64 = self.run("incrby", conn.incr(key, amount)).await?;
        Ok(value)
    }

    async fn set_many(&self, items: &[BatchWrite]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection()?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for item in items {
            pipe.cmd("SET")
                .arg(&item.key)
                .arg(&item.value)
                .arg("PX")
                .arg(ttl_millis(item.ttl))
                .ignore();
        }

        self.run("pipeline", pipe.query_async::<()>(&mut conn)).await?;
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("MGET");
        cmd.arg(keys.to_vec());

        let values: Vec<Option<String>> = self.run("mget", cmd.query_async(&mut conn)).await?;
        Ok(values)
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection()?;
        self.run("flushdb", redis::cmd("FLUSHDB").query_async::<()>(&mut conn))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let _: String = self
            .run("ping", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}
