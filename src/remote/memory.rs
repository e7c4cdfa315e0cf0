//! In-Memory Remote Cache
//!
//! A process-local backend with memcached semantics: TTL expiry, LRU eviction,
//! key validation, add-only stores and unsigned counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::RemoteError;
use crate::key::MAX_KEY_LENGTH;
use crate::remote::{CacheStats, ItemEntry, LruTracker, Payload, RemoteCache};

/// Name this backend reports its statistics under.
const SERVER_NAME: &str = "memory";

#[derive(Debug, Default)]
struct Items {
    entries: HashMap<String, ItemEntry>,
    lru: LruTracker,
    stats: CacheStats,
}

impl Items {
    fn remove(&mut self, key: &str) -> Option<ItemEntry> {
        let removed = self.entries.remove(key);
        self.lru.remove(key);
        self.stats.set_curr_items(self.entries.len());
        removed
    }

    /// Live item for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, clock: &dyn Clock) -> Option<&mut ItemEntry> {
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(clock.now()))
        {
            self.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn store(&mut self, key: String, entry: ItemEntry, max_entries: usize) {
        if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                debug!("evicting {}", evicted);
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.stats.record_set();
        self.stats.set_curr_items(self.entries.len());
    }
}

// == Memory Cache ==
/// In-process [`RemoteCache`].
#[derive(Debug)]
pub struct MemoryCache {
    items: RwLock<Items>,
    clock: Arc<dyn Clock>,
    namespace: String,
    max_entries: usize,
    offline: AtomicBool,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a backend using the namespace and capacity from `config`.
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a backend whose expiry follows `clock`.
    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: RwLock::new(Items::default()),
            clock,
            namespace: config.namespace().unwrap_or_default(),
            max_entries: config.max_entries.max(1),
            offline: AtomicBool::new(false),
        }
    }

    /// Makes every operation fail with an I/O error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    // == Cleanup Expired ==
    /// Removes all expired items and returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut items = self.items.write().await;

        let expired: Vec<String> = items
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            items.remove(key);
        }
        expired.len()
    }

    /// Remaining lifetime of a stored key, None if missing or never expiring.
    pub async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let items = self.items.read().await;
        items
            .entries
            .get(&self.namespaced(key))
            .and_then(|entry| entry.ttl_remaining(self.clock.now()))
    }

    /// Number of stored items, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.items.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Namespaced key, after the checks memcached applies to keys.
    fn checked_key(&self, key: &str) -> Result<String, RemoteError> {
        self.ensure_online()?;

        let full = self.namespaced(key);
        if key.is_empty() {
            return Err(RemoteError::Protocol("empty key".to_string()));
        }
        if full.len() > MAX_KEY_LENGTH {
            return Err(RemoteError::Protocol(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if full.bytes().any(|b| b <= b' ' || b == 0x7F) {
            return Err(RemoteError::Protocol(
                "key contains whitespace or control characters".to_string(),
            ));
        }
        Ok(full)
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Io("server unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn apply_delta(
        &self,
        key: &str,
        delta: impl FnOnce(u64) -> u64,
    ) -> Result<u64, RemoteError> {
        let key = self.checked_key(key)?;
        let mut items = self.items.write().await;
        let entry = items
            .live(&key, self.clock.as_ref())
            .ok_or(RemoteError::NotFound)?;

        let current: u64 = std::str::from_utf8(&entry.payload.data)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| {
                RemoteError::Protocol(
                    "cannot increment or decrement non-numeric value".to_string(),
                )
            })?;

        let updated = delta(current);
        entry.payload.data = updated.to_string().into_bytes();
        Ok(updated)
    }
}

#[async_trait]
impl RemoteCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Payload, RemoteError> {
        let key = self.checked_key(key)?;
        let mut items = self.items.write().await;

        let found = items
            .live(&key, self.clock.as_ref())
            .map(|entry| entry.payload.clone());
        match found {
            Some(payload) => {
                items.lru.touch(&key);
                items.stats.record_hit();
                Ok(payload)
            }
            None => {
                items.stats.record_miss();
                Err(RemoteError::NotFound)
            }
        }
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Payload>, RemoteError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            match self.get(key).await {
                Ok(payload) => {
                    found.insert(key.clone(), payload);
                }
                Err(RemoteError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    async fn set(&self, key: &str, payload: Payload, ttl: u32) -> Result<(), RemoteError> {
        let key = self.checked_key(key)?;
        let entry = ItemEntry::new(payload, ttl, self.clock.now());
        self.items.write().await.store(key, entry, self.max_entries);
        Ok(())
    }

    async fn add(&self, key: &str, payload: Payload, ttl: u32) -> Result<(), RemoteError> {
        let key = self.checked_key(key)?;
        let mut items = self.items.write().await;
        if items.live(&key, self.clock.as_ref()).is_some() {
            return Err(RemoteError::NotStored);
        }

        let entry = ItemEntry::new(payload, ttl, self.clock.now());
        items.store(key, entry, self.max_entries);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RemoteError> {
        let key = self.checked_key(key)?;
        let mut items = self.items.write().await;
        if items.live(&key, self.clock.as_ref()).is_none() {
            return Err(RemoteError::NotFound);
        }
        items.remove(&key);
        Ok(())
    }

    async fn incr(&self, key: &str, amount: u64) -> Result<u64, RemoteError> {
        self.apply_delta(key, |current| current.wrapping_add(amount))
            .await
    }

    async fn decr(&self, key: &str, amount: u64) -> Result<u64, RemoteError> {
        self.apply_delta(key, |current| current.saturating_sub(amount))
            .await
    }

    async fn flush(&self) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut items = self.items.write().await;
        items.entries.clear();
        items.lru.clear();
        items.stats.set_curr_items(0);
        Ok(())
    }

    async fn stats(&self) -> Result<HashMap<String, CacheStats>, RemoteError> {
        self.ensure_online()?;
        let items = self.items.read().await;
        let mut stats = items.stats.clone();
        stats.set_curr_items(items.entries.len());
        Ok(HashMap::from([(SERVER_NAME.to_string(), stats)]))
    }

    async fn reset(&self) -> Result<(), RemoteError> {
        self.ensure_online()
    }
}
