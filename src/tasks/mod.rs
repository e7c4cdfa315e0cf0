//! Background Tasks Module
//!
//! Periodic maintenance for the in-memory backend.
//!
//! # Tasks
//! - Expiry sweep: drops expired items at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
