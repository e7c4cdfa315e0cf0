//! Remote Cache Module
//!
//! The capability the store consumes from a cache server client, and an
//! in-process implementation with memcached semantics.

mod entry;
mod lru;
mod memory;
mod stats;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RemoteError;

// Re-export public types
pub use entry::ItemEntry;
pub use lru::LruTracker;
pub use memory::MemoryCache;
pub use stats::CacheStats;

/// Item flag marking a serialized (structured) payload.
pub const FLAG_STRUCTURED: u32 = 0x1;

// == Payload ==
/// Bytes stored under a key, with the item flags the client keeps next to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub data: Vec<u8>,
    pub flags: u32,
}

impl Payload {
    /// Payload holding bytes exactly as given.
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            flags: 0,
        }
    }

    /// Payload holding a serialized value.
    pub fn structured(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            flags: FLAG_STRUCTURED,
        }
    }

    pub fn is_structured(&self) -> bool {
        self.flags & FLAG_STRUCTURED != 0
    }
}

// == Remote Cache ==
/// Operations of a cache server client.
///
/// Implementations own connection pooling, server distribution and failover.
/// A missing key must be reported as [`RemoteError::NotFound`], distinct from
/// I/O failures. TTLs are in seconds, 0 meaning no expiry.
#[async_trait]
pub trait RemoteCache: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Payload, RemoteError>;

    /// Batched get. Missing keys are left out of the result.
    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Payload>, RemoteError>;

    async fn set(&self, key: &str, payload: Payload, ttl: u32) -> Result<(), RemoteError>;

    /// Stores only if the key is absent, otherwise [`RemoteError::NotStored`].
    async fn add(&self, key: &str, payload: Payload, ttl: u32) -> Result<(), RemoteError>;

    async fn delete(&self, key: &str) -> Result<(), RemoteError>;

    async fn incr(&self, key: &str, amount: u64) -> Result<u64, RemoteError>;

    async fn decr(&self, key: &str, amount: u64) -> Result<u64, RemoteError>;

    /// Drops every item on every server.
    async fn flush(&self) -> Result<(), RemoteError>;

    /// Statistics keyed by server address.
    async fn stats(&self) -> Result<HashMap<String, CacheStats>, RemoteError>;

    /// Drops and re-establishes server connections, e.g. after a fork.
    async fn reset(&self) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_flags() {
        assert!(!Payload::raw("1").is_structured());
        assert!(Payload::structured("1").is_structured());
        assert!(Payload { data: vec![], flags: 0x3 }.is_structured());
    }
}
