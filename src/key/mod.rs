//! Key Module
//!
//! Turns application keys into protocol-safe, length-bounded wire keys.

mod cache_key;
mod normalize;
mod wire;


// Re-export public types
pub use cache_key::{CacheKey, Cacheable, Scalar, ToCacheKey};
pub use normalize::normalize;
pub use wire::{escape_key, wire_key, DIGEST_SEPARATOR, MAX_KEY_LENGTH, TRUNCATED_PREFIX_LENGTH};
