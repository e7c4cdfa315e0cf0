//! Expiry Sweep Task
//!
//! Background task that periodically removes expired items from a
//! [`MemoryCache`]. Expired items are already invisible to reads; the sweep
//! only reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::remote::MemoryCache;

/// Spawns a task that sweeps expired items every `interval`.
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MemoryCache::new(&StoreConfig::default()));
/// let sweeper = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<MemoryCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired items", removed);
            } else {
                debug!("Expiry sweep: no expired items found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StoreConfig;
    use crate::remote::{Payload, RemoteCache};

    fn manual_cache() -> (Arc<MemoryCache>, ManualClock) {
        let clock = ManualClock::default();
        let cache = MemoryCache::with_clock(&StoreConfig::default(), Arc::new(clock.clone()));
        (Arc::new(cache), clock)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_items() {
        let (cache, clock) = manual_cache();
        cache.set("expire_soon", Payload::raw("v"), 1).await.unwrap();
        cache.set("long_lived", Payload::raw("v"), 3600).await.unwrap();
        clock.advance(chrono::Duration::seconds(2));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.len().await, 1, "Expired item should have been swept");
        assert!(cache.get("long_lived").await.is_ok());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (cache, _) = manual_cache();

        let handle = spawn_cleanup_task(cache, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
