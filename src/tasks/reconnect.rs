//! Durable Backend Reconnect Task

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::cache::CacheService;

/// Spawns a probe that tries to bring a disconnected durable backend back
/// every `reconnect_interval_secs`.
///
/// While the backend stays down the cache keeps serving from its fallback
/// store. Returns `None` when there is no durable backend to watch.
pub fn spawn_reconnect_task(
    cache: Arc<CacheService>,
    reconnect_interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if !cache.has_durable_backend() {
        return None;
    }

    let period = Duration::from_secs(reconnect_interval_secs.max(1));

    Some(tokio::spawn(async move {
        info!(
            "Starting reconnect task with interval of {} seconds",
            period.as_secs()
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if !cache.is_durable_active() {
                cache.reconnect().await;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_task_without_durable_backend() {
        let cache = Arc::new(CacheService::in_memory(10));

        assert!(spawn_reconnect_task(cache, 1).is_none());
    }
}
