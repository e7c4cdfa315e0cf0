//! Store Options
//!
//! Per-call options for reads, writes and fetches.

use crate::error::{Result, StoreError};

/// Options for [`crate::Store::read`] and [`crate::Store::exist`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Return stored bytes without structured decoding
    pub raw: bool,
}

impl ReadOptions {
    pub fn raw() -> Self {
        Self { raw: true }
    }
}

/// Options for [`crate::Store::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Lifetime in seconds, 0 = never expire
    pub expires_in: u32,
    /// Store the value's plain text form instead of serializing it
    pub raw: bool,
    /// Only store if the key is absent
    pub unless_exist: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_in(mut self, seconds: u32) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn unless_exist(mut self) -> Self {
        self.unless_exist = true;
        self
    }
}

/// Options for [`crate::Store::fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Logical lifetime in seconds of a computed value
    pub expires_in: Option<u32>,
    /// Seconds a stale value stays servable while one caller refreshes it
    pub race_condition_ttl: Option<u32>,
    /// Store and read plain text instead of serialized values
    pub raw: bool,
    /// Recompute even if a value is cached
    pub force: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_in(mut self, seconds: u32) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    pub fn race_condition_ttl(mut self, seconds: u32) -> Self {
        self.race_condition_ttl = Some(seconds);
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Write options used when a plain fetch stores its computed value.
    pub(crate) fn write_options(&self) -> WriteOptions {
        WriteOptions {
            expires_in: self.expires_in.unwrap_or(0),
            raw: self.raw,
            unless_exist: false,
        }
    }

    /// Race window if race-condition TTL is requested.
    ///
    /// A race TTL of 0 disables the protocol. A race TTL without a non-zero
    /// `expires_in` is rejected.
    pub(crate) fn race_window(&self) -> Result<Option<RaceWindow>> {
        match (self.race_condition_ttl, self.expires_in) {
            (None | Some(0), _) => Ok(None),
            (Some(race_ttl), Some(expires_in)) if expires_in > 0 => Ok(Some(RaceWindow {
                expires_in,
                race_ttl,
            })),
            (Some(_), _) => Err(StoreError::InvalidOptions(
                "race_condition_ttl requires a non-zero expires_in".to_string(),
            )),
        }
    }
}

/// Validated race-condition TTL settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RaceWindow {
    pub expires_in: u32,
    pub race_ttl: u32,
}

impl RaceWindow {
    /// TTL handed to the server: the logical lifetime plus the race window,
    /// so the server never evicts before racers can react.
    pub fn stored_ttl(&self) -> u32 {
        self.expires_in.saturating_add(self.race_ttl)
    }
}
