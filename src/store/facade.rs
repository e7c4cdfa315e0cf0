//! Store Facade
//!
//! Public cache operations over a [`RemoteCache`]. Keys are normalized and
//! made wire-safe here, and every remote failure is logged and degraded to a
//! miss so the cache never fails the caller's request.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::config::{ServerAddress, StoreConfig};
use crate::error::{RemoteError, Result, StoreError};
use crate::key::{normalize, wire_key, CacheKey, ToCacheKey};
use crate::remote::{CacheStats, MemoryCache, Payload, RemoteCache};
use crate::store::entry::{self, Decoded, StoredEntry};
use crate::store::{ReadOptions, WriteOptions};

/// Result of [`Store::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The key existed and was removed
    Deleted,
    /// Nothing was stored under the key
    NotFound,
    /// The server could not be asked
    Failed,
}

impl DeleteOutcome {
    pub fn is_deleted(self) -> bool {
        self == DeleteOutcome::Deleted
    }
}

// == Store ==
/// Cache store facade.
///
/// Holds no locks of its own; sharing one instance across tasks is as safe
/// as the underlying [`RemoteCache`].
#[derive(Debug, Clone)]
pub struct Store {
    remote: Arc<dyn RemoteCache>,
    config: StoreConfig,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Store {
    // == Constructor ==
    /// Creates a store over `remote` using wall clock time.
    pub fn new(remote: Arc<dyn RemoteCache>, config: StoreConfig) -> Self {
        Self::with_clock(remote, config, Arc::new(SystemClock))
    }

    /// Creates a store whose envelope expiry follows `clock`.
    pub fn with_clock(
        remote: Arc<dyn RemoteCache>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            remote,
            config,
            clock,
        }
    }

    /// Creates a store backed by an in-process [`MemoryCache`].
    pub fn in_memory(config: StoreConfig) -> Self {
        let remote = Arc::new(MemoryCache::new(&config));
        Self::new(remote, config)
    }

    pub fn addresses(&self) -> &[ServerAddress] {
        &self.config.addresses
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Wire key the server sees for `key`, namespace excluded.
    ///
    /// Fails with [`StoreError::InvalidOptions`] if the configured namespace
    /// leaves no room for a bounded key.
    pub fn wire_key<K: ToCacheKey + ?Sized>(&self, key: &K) -> Result<String> {
        self.config.validate()?;
        Ok(self.wire_key_of(&key.to_cache_key()?))
    }

    fn wire_key_of(&self, key: &CacheKey) -> String {
        wire_key(&normalize(key), self.config.namespace_len())
    }

    // == Read ==
    /// Reads a value, None on a miss or any server failure.
    pub async fn read<K, T>(&self, key: &K, opts: &ReadOptions) -> Result<Option<T>>
    where
        K: ToCacheKey + ?Sized,
        T: DeserializeOwned,
    {
        let wire = self.wire_key(key)?;
        debug!("Cache read: {}", wire);

        let payload = self.get_payload(&wire).await;
        Ok(payload.and_then(|payload| self.decode_payload(&wire, payload, opts.raw)))
    }

    // == Write ==
    /// Writes a value, false if it was not stored.
    ///
    /// With `unless_exist` an already present key is left untouched.
    pub async fn write<K, T>(&self, key: &K, value: &T, opts: &WriteOptions) -> Result<bool>
    where
        K: ToCacheKey + ?Sized,
        T: Serialize + ?Sized,
    {
        let wire = self.wire_key(key)?;
        debug!("Cache write: {}", wire);

        Ok(self.write_value(&wire, value, opts).await)
    }

    // == Delete ==
    pub async fn delete<K: ToCacheKey + ?Sized>(&self, key: &K) -> Result<DeleteOutcome> {
        let wire = self.wire_key(key)?;
        debug!("Cache delete: {}", wire);

        Ok(match self.remote.delete(&wire).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(RemoteError::NotFound) => DeleteOutcome::NotFound,
            Err(e) => {
                self.log_error("delete", &wire, &e);
                DeleteOutcome::Failed
            }
        })
    }

    // == Exist ==
    /// True iff a read of `key` finds a value.
    pub async fn exist<K: ToCacheKey + ?Sized>(&self, key: &K, opts: &ReadOptions) -> Result<bool> {
        let found: Option<serde_json::Value> = self.read(key, opts).await?;
        Ok(found.is_some())
    }

    // == Counters ==
    /// Atomically adds `amount` to a raw numeric value.
    pub async fn increment<K: ToCacheKey + ?Sized>(&self, key: &K, amount: u64) -> Result<Option<u64>> {
        let wire = self.wire_key(key)?;
        debug!("incrementing {} by {}", wire, amount);

        Ok(self.counter_result("increment", &wire, self.remote.incr(&wire, amount).await))
    }

    /// Atomically subtracts `amount` from a raw numeric value, stopping at 0.
    pub async fn decrement<K: ToCacheKey + ?Sized>(&self, key: &K, amount: u64) -> Result<Option<u64>> {
        let wire = self.wire_key(key)?;
        debug!("decrementing {} by {}", wire, amount);

        Ok(self.counter_result("decrement", &wire, self.remote.decr(&wire, amount).await))
    }

    // == Read Multi ==
    /// Reads several keys with one batched request.
    ///
    /// The result is keyed by the original keys; misses are left out. A
    /// failed batch yields an empty map.
    pub async fn read_multi<K, T>(&self, keys: &[K]) -> Result<HashMap<CacheKey, T>>
    where
        K: ToCacheKey,
        T: DeserializeOwned,
    {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        self.config.validate()?;

        let mut originals: HashMap<String, Vec<CacheKey>> = HashMap::with_capacity(keys.len());
        let mut wire_keys = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.to_cache_key()?;
            match originals.entry(self.wire_key_of(&key)) {
                Entry::Occupied(mut slot) => slot.get_mut().push(key),
                Entry::Vacant(slot) => {
                    wire_keys.push(slot.key().clone());
                    slot.insert(vec![key]);
                }
            }
        }
        debug!("Cache read multi: {:?}", wire_keys);

        let found = match self.remote.get_multi(&wire_keys).await {
            Ok(found) => found,
            Err(e) => {
                self.log_error("read_multi", &wire_keys.join(","), &e);
                return Ok(HashMap::new());
            }
        };

        let mut values = HashMap::with_capacity(found.len());
        for (wire, payload) in found {
            let Some(origins) = originals.remove(&wire) else {
                continue;
            };
            for key in origins {
                if let Some(value) = self.decode_payload(&wire, payload.clone(), false) {
                    values.insert(key, value);
                }
            }
        }
        Ok(values)
    }

    // == Delete Matched ==
    /// Pattern deletion has no server-side support.
    pub fn delete_matched(&self, pattern: &str) -> Result<()> {
        Err(StoreError::NotSupported(format!(
            "delete_matched({pattern}): the server cannot scan keys"
        )))
    }

    // == Administration ==
    /// Flushes every item on every server.
    pub async fn clear(&self) -> bool {
        debug!("Cache clear");
        self.admin("clear", self.remote.flush().await).is_some()
    }

    /// Server statistics keyed by server, empty if they could not be read.
    pub async fn stats(&self) -> HashMap<String, CacheStats> {
        self.admin("stats", self.remote.stats().await)
            .unwrap_or_default()
    }

    /// Re-establishes server connections; call after forking.
    pub async fn reset(&self) -> bool {
        self.admin("reset", self.remote.reset().await).is_some()
    }

    // == Internals ==

    /// Payload under `wire`, None on a miss or failure.
    pub(crate) async fn get_payload(&self, wire: &str) -> Option<Payload> {
        match self.remote.get(wire).await {
            Ok(payload) => Some(payload),
            Err(RemoteError::NotFound) => None,
            Err(e) => {
                self.log_error("read", wire, &e);
                None
            }
        }
    }

    /// Stored entry under `wire`, envelope intact.
    pub(crate) async fn read_entry(&self, wire: &str) -> Option<Decoded> {
        let payload = self.get_payload(wire).await?;
        match entry::decode(payload) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.log_error("decode", wire, &e);
                None
            }
        }
    }

    pub(crate) fn decode_payload<T: DeserializeOwned>(
        &self,
        wire: &str,
        payload: Payload,
        raw: bool,
    ) -> Option<T> {
        match entry::decode_value(payload, raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.log_error("decode", wire, &e);
                None
            }
        }
    }

    pub(crate) async fn write_value<T: Serialize + ?Sized>(
        &self,
        wire: &str,
        value: &T,
        opts: &WriteOptions,
    ) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                self.log_error("encode", wire, &e);
                return false;
            }
        };

        let payload = if opts.raw {
            entry::encode_raw(&value)
        } else {
            match StoredEntry::Plain(value).encode() {
                Ok(payload) => payload,
                Err(e) => {
                    self.log_error("encode", wire, &e);
                    return false;
                }
            }
        };

        self.store_payload(wire, payload, opts.expires_in, opts.unless_exist)
            .await
    }

    pub(crate) async fn write_entry(&self, wire: &str, entry: &StoredEntry, ttl: u32) -> bool {
        match entry.encode() {
            Ok(payload) => self.store_payload(wire, payload, ttl, false).await,
            Err(e) => {
                self.log_error("encode", wire, &e);
                false
            }
        }
    }

    async fn store_payload(&self, wire: &str, payload: Payload, ttl: u32, unless_exist: bool) -> bool {
        let stored = if unless_exist {
            self.remote.add(wire, payload, ttl).await
        } else {
            self.remote.set(wire, payload, ttl).await
        };

        match stored {
            Ok(()) => true,
            Err(RemoteError::NotStored) => {
                debug!("Cache write skipped, {} already exists", wire);
                false
            }
            Err(e) => {
                self.log_error("write", wire, &e);
                false
            }
        }
    }

    fn counter_result(
        &self,
        op: &str,
        wire: &str,
        result: std::result::Result<u64, RemoteError>,
    ) -> Option<u64> {
        match result {
            Ok(value) => Some(value),
            Err(RemoteError::NotFound) => None,
            Err(e) => {
                self.log_error(op, wire, &e);
                None
            }
        }
    }

    fn admin<T>(&self, op: &str, result: std::result::Result<T, RemoteError>) -> Option<T> {
        result
            .map_err(|e| self.log_error(op, "*", &e))
            .ok()
    }

    fn log_error(&self, op: &str, key: &str, err: &dyn Display) {
        if self.config.log_errors {
            error!("MemcachedError during {} of {}: {}", op, key, err);
        }
    }
}
