//! Entry Codec
//!
//! Wraps values into payloads and back. Structured values are serialized as
//! a tagged [`StoredEntry`]; raw values are stored as their plain text.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;
use crate::remote::Payload;

// == Race Envelope ==
/// A value stored by a race-condition TTL fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEnvelope {
    /// The cached value
    pub value: Value,
    /// Logical expiry; the server keeps the item longer than this
    pub expires_at: DateTime<Utc>,
    /// Set by the caller that is recomputing the value
    pub refreshing: bool,
}

impl RaceEnvelope {
    pub fn new(value: Value, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at,
            refreshing: false,
        }
    }

    /// Expired once `now` reaches the logical expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whole seconds until the logical expiry, rounded up and never below 1,
    /// so it can't turn into a "never expire" TTL.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let millis = (self.expires_at - now).num_milliseconds().max(0);
        let secs = (millis + 999) / 1000;
        u32::try_from(secs).unwrap_or(u32::MAX).max(1)
    }

    /// Marks the envelope as being refreshed and holds it fresh for `window`.
    pub fn claim_refresh(&mut self, now: DateTime<Utc>, window: Duration) {
        self.refreshing = true;
        self.expires_at = now + window;
    }
}

// == Stored Entry ==
/// What a structured payload holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StoredEntry {
    Plain(Value),
    Race(RaceEnvelope),
}

impl StoredEntry {
    /// The cached value, unwrapping a race envelope.
    pub fn into_value(self) -> Value {
        match self {
            StoredEntry::Plain(value) => value,
            StoredEntry::Race(envelope) => envelope.value,
        }
    }

    /// Serializes the entry into a structured payload.
    pub fn encode(&self) -> Result<Payload, CodecError> {
        Ok(Payload::structured(serde_json::to_vec(self)?))
    }
}

// == Decoded Payload ==
/// A payload read back from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Entry(StoredEntry),
    Raw(Vec<u8>),
}

impl Decoded {
    /// Converts into the caller's type, unwrapping envelopes.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, CodecError> {
        match self {
            Decoded::Entry(entry) => Ok(serde_json::from_value(entry.into_value())?),
            Decoded::Raw(bytes) => decode_raw(&bytes),
        }
    }
}

/// Splits a payload by its structured flag.
pub fn decode(payload: Payload) -> Result<Decoded, CodecError> {
    if payload.is_structured() {
        Ok(Decoded::Entry(serde_json::from_slice(&payload.data)?))
    } else {
        Ok(Decoded::Raw(payload.data))
    }
}

/// Decodes a payload into `T`. With `raw` the bytes are taken as stored,
/// whatever the payload's flags say.
pub fn decode_value<T: DeserializeOwned>(payload: Payload, raw: bool) -> Result<T, CodecError> {
    if raw {
        decode_raw(&payload.data)
    } else {
        decode(payload)?.into_typed()
    }
}

/// Raw bytes are read as JSON text first (numbers, booleans), then as a
/// plain string.
fn decode_raw<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(err) => {
            let text = std::str::from_utf8(bytes).map_err(|_| CodecError(err))?;
            Ok(serde_json::from_value(Value::String(text.to_string()))?)
        }
    }
}

/// Plain text form of a value: strings as-is, anything else as JSON text.
pub fn encode_raw(value: &Value) -> Payload {
    match value {
        Value::String(s) => Payload::raw(s.as_bytes()),
        other => Payload::raw(other.to_string()),
    }
}
