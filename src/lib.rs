//! Memcached Store - A cache store facade for memcached-style servers
//!
//! Normalizes arbitrary keys into protocol-safe wire keys, degrades server
//! failures to cache misses, and avoids recomputation stampedes with
//! race-condition TTL fetches.

pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod remote;
pub mod store;
pub mod tasks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use error::{RemoteError, Result, StoreError};
pub use key::{CacheKey, Cacheable, ToCacheKey};
pub use remote::{MemoryCache, RemoteCache};
pub use store::{DeleteOutcome, FetchOptions, ReadOptions, Store, WriteOptions};
pub use tasks::spawn_cleanup_task;
