//! Item Entry Module
//!
//! A stored item of the in-memory backend with its expiry.

use chrono::{DateTime, Duration, Utc};

use crate::remote::Payload;

// == Item Entry ==
/// A single stored item with its payload and expiry.
#[derive(Debug, Clone)]
pub struct ItemEntry {
    /// The stored payload
    pub payload: Payload,
    /// Expiry instant, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl ItemEntry {
    // == Constructor ==
    /// Creates an item stored at `now` that lives for `ttl_seconds`.
    ///
    /// A TTL of 0 never expires.
    pub fn new(payload: Payload, ttl_seconds: u32, now: DateTime<Utc>) -> Self {
        let expires_at = (ttl_seconds > 0).then(|| now + Duration::seconds(i64::from(ttl_seconds)));

        Self {
            payload,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An item is expired once `now` reaches its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired, None if the item never expires.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expires| (expires - now).max(Duration::zero()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_no_ttl_never_expires() {
        let now = Utc::now();
        let entry = ItemEntry::new(Payload::raw("v"), 0, now);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(now + Duration::days(365)));
        assert!(entry.ttl_remaining(now).is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let now = Utc::now();
        let entry = ItemEntry::new(Payload::raw("v"), 6, now);

        assert!(!entry.is_expired(now + Duration::seconds(5)));
        assert!(entry.is_expired(now + Duration::seconds(7)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = ItemEntry::new(Payload::raw("v"), 1, now);

        // Expired exactly when the TTL has fully elapsed
        assert!(entry.is_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Utc::now();
        let entry = ItemEntry::new(Payload::raw("v"), 10, now);

        assert_eq!(
            entry.ttl_remaining(now + Duration::seconds(4)),
            Some(Duration::seconds(6))
        );
        assert_eq!(
            entry.ttl_remaining(now + Duration::seconds(30)),
            Some(Duration::zero())
        );
    }
}
