//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.
//!
//! Two families exist. [`StoreError`] covers caller mistakes and is returned
//! to the application. [`RemoteError`] covers failures of the cache server and
//! never leaves the store facade: it is logged and turned into a miss.

use thiserror::Error;

// == Store Error Enum ==
/// Errors surfaced to callers of the store facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Key shape cannot be turned into a cache key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Option combination is not usable
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Operation is not available on this store
    #[error("Not supported: {0}")]
    NotSupported(String),
}

// == Remote Error Enum ==
/// Failures reported by a [`crate::remote::RemoteCache`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Key is not present on the server
    #[error("not found")]
    NotFound,

    /// Conditional store (add) was rejected because the key exists
    #[error("not stored")]
    NotStored,

    /// Connection, timeout or server unavailable
    #[error("I/O failure: {0}")]
    Io(String),

    /// Server rejected the request
    #[error("protocol failure: {0}")]
    Protocol(String),
}

// == Codec Error ==
/// Stored payload could not be encoded or decoded.
#[derive(Error, Debug)]
#[error("codec failure: {0}")]
pub struct CodecError(#[from] pub serde_json::Error);

// == Result Type Alias ==
/// Convenience Result type for the store facade.
pub type Result<T> = std::result::Result<T, StoreError>;
