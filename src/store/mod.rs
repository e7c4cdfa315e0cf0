//! Store Module
//!
//! The cache store facade, its entry codec, and read-through fetches with
//! race-condition TTL.

pub mod entry;
mod facade;
mod options;
mod race;


// Re-export public types
pub use entry::{RaceEnvelope, StoredEntry};
pub use facade::{DeleteOutcome, Store};
pub use options::{FetchOptions, ReadOptions, WriteOptions};
