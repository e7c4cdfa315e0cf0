//! Fetch and Race-Condition TTL
//!
//! Read-through fetches. With a race-condition TTL the value is stored inside
//! a [`RaceEnvelope`] whose logical expiry is shorter than the server TTL.
//! The first caller to see it expired flags the envelope and recomputes;
//! everyone else keeps getting the stale value until the fresh one lands.
//!
//! Coordination is last-write-wins through the server, so callers that read
//! the envelope before the flag is written may all recompute.

use std::future::Future;

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::key::ToCacheKey;
use crate::store::entry::{Decoded, RaceEnvelope, StoredEntry};
use crate::store::options::RaceWindow;
use crate::store::{FetchOptions, Store};

impl Store {
    // == Fetch ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// With `race_condition_ttl` set, an expired value is refreshed by a
    /// single caller while concurrent callers get the stale value. Fails with
    /// [`crate::StoreError::InvalidOptions`] if `race_condition_ttl` comes
    /// without `expires_in`.
    pub async fn fetch<K, T, F, Fut>(&self, key: &K, opts: &FetchOptions, compute: F) -> Result<T>
    where
        K: ToCacheKey + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let race = opts.race_window()?;
        let wire = self.wire_key(key)?;

        Ok(match race {
            Some(window) => {
                self.fetch_with_race_ttl(&wire, window, opts.force, compute)
                    .await
            }
            None => self.fetch_plain(&wire, opts, compute).await,
        })
    }

    async fn fetch_plain<T, F, Fut>(&self, wire: &str, opts: &FetchOptions, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !opts.force {
            if let Some(payload) = self.get_payload(wire).await {
                if let Some(value) = self.decode_payload(wire, payload, opts.raw) {
                    debug!("Cache hit: {}", wire);
                    return value;
                }
            }
        }

        debug!("Cache generate: {}", wire);
        let value = compute().await;
        self.write_value(wire, &value, &opts.write_options()).await;
        value
    }

    async fn fetch_with_race_ttl<T, F, Fut>(
        &self,
        wire: &str,
        window: RaceWindow,
        force: bool,
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !force {
            match self.read_entry(wire).await {
                Some(Decoded::Entry(StoredEntry::Race(envelope))) => {
                    if let Some(value) = self.serve_or_claim(wire, envelope, window).await {
                        return value;
                    }
                }
                Some(decoded) => {
                    if let Some(value) = self.typed(wire, decoded) {
                        return value;
                    }
                }
                None => {}
            }
        }

        debug!("Cache generate: {}", wire);
        let value = compute().await;
        self.store_fresh(wire, &value, window).await;
        value
    }

    /// Serves the envelope's value unless this caller has to refresh it.
    ///
    /// Returns None after claiming the refresh, or if the stored value no
    /// longer decodes into `T`.
    async fn serve_or_claim<T: DeserializeOwned>(
        &self,
        wire: &str,
        mut envelope: RaceEnvelope,
        window: RaceWindow,
    ) -> Option<T> {
        let now = self.clock.now();

        if !envelope.is_expired(now) {
            return self.typed_value(wire, envelope.value);
        }
        if envelope.refreshing {
            debug!("Cache serving stale value for {} during refresh", wire);
            return self.typed_value(wire, envelope.value);
        }

        debug!("Cache claiming refresh of {}", wire);
        envelope.claim_refresh(now, Duration::seconds(i64::from(window.race_ttl)));
        let ttl = envelope
            .remaining_secs(now)
            .saturating_add(window.race_ttl);
        self.write_entry(wire, &StoredEntry::Race(envelope), ttl).await;
        None
    }

    async fn store_fresh<T: Serialize>(&self, wire: &str, value: &T, window: RaceWindow) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                debug!("Cache not storing {}: {}", wire, e);
                return;
            }
        };

        let expires_at = self.clock.now() + Duration::seconds(i64::from(window.expires_in));
        let envelope = RaceEnvelope::new(value, expires_at);
        self.write_entry(wire, &StoredEntry::Race(envelope), window.stored_ttl())
            .await;
    }

    fn typed<T: DeserializeOwned>(&self, wire: &str, decoded: Decoded) -> Option<T> {
        decoded
            .into_typed()
            .map_err(|e| debug!("Cache value of {} does not decode: {}", wire, e))
            .ok()
    }

    fn typed_value<T: DeserializeOwned>(&self, wire: &str, value: Value) -> Option<T> {
        self.typed(wire, Decoded::Entry(StoredEntry::Plain(value)))
    }
}
