//! Fallback Store Cleanup Task
//!
//! Periodically evicts expired entries from the in-process store. Entries
//! are also dropped lazily on read; the sweep reclaims memory for keys that
//! are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheService;

/// Spawns the sweep loop, one sweep per `cleanup_interval_secs`.
///
/// A single task runs every sweep, so sweeps never overlap; ticks missed
/// while a sweep is slow are skipped rather than replayed. Abort the
/// returned handle on shutdown.
pub fn spawn_cleanup_task(cache: Arc<CacheService>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            period.as_secs()
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.cleanup_memory_cache();
            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}
