//! Wire Keys
//!
//! Escapes normalized keys into the byte set the protocol accepts and bounds
//! their length, falling back to a digest suffix for long keys.

use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Longest key the protocol accepts, namespace included.
pub const MAX_KEY_LENGTH: usize = 250;

/// Bytes of the escaped key kept in front of the digest when truncating.
pub const TRUNCATED_PREFIX_LENGTH: usize = 213;

/// Marker between the truncated prefix and the digest.
pub const DIGEST_SEPARATOR: &str = ":md5:";

/// Bytes the protocol rejects in keys, plus `%` so escapes stay unambiguous.
/// Non-ASCII bytes are always escaped.
const WIRE_UNSAFE: &AsciiSet = &CONTROLS.add(b' ').add(b'%');

/// Percent-escapes every byte outside the printable ASCII range, plus `%`.
pub fn escape_key(key: &str) -> String {
    utf8_percent_encode(key, WIRE_UNSAFE).to_string()
}

/// Builds the wire key for a normalized key.
///
/// The result plus `namespace_len` never exceeds [`MAX_KEY_LENGTH`] as long
/// as `namespace_len` is at most [`TRUNCATED_PREFIX_LENGTH`]; longer
/// namespaces are rejected by [`crate::StoreConfig::validate`].
pub fn wire_key(normalized: &str, namespace_len: usize) -> String {
    let escaped = escape_key(normalized);
    if escaped.len() + namespace_len <= MAX_KEY_LENGTH {
        return escaped;
    }

    // Escaped keys are ASCII, any byte index is a char boundary.
    let keep = TRUNCATED_PREFIX_LENGTH.saturating_sub(namespace_len);
    let digest = hex::encode(Md5::digest(escaped.as_bytes()));
    format!("{}{}{}", &escaped[..keep], DIGEST_SEPARATOR, digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_keys_unchanged() {
        assert_eq!(escape_key("views/posts/7?page=2"), "views/posts/7?page=2");
        assert_eq!(wire_key("users:1", 0), "users:1");
    }

    #[test]
    fn test_unsafe_bytes_escaped() {
        assert_eq!(escape_key("a b"), "a%20b");
        assert_eq!(escape_key("100%"), "100%25");
        assert_eq!(escape_key("tab\there"), "tab%09here");
        assert_eq!(escape_key("caf\u{e9}"), "caf%C3%A9");
        assert_eq!(escape_key("\u{7f}"), "%7F");
    }

    #[test]
    fn test_only_printable_ascii_passes_through() {
        for byte in 0u8..=0x7F {
            let key = (byte as char).to_string();
            let expected = if (0x21..=0x7E).contains(&byte) && byte != b'%' {
                key.clone()
            } else {
                format!("%{byte:02X}")
            };
            assert_eq!(escape_key(&key), expected, "byte {byte:#04x}");
        }
        assert_eq!(escape_key("a:b/c?d=e&f"), "a:b/c?d=e&f");
        assert_eq!(escape_key("\u{1F600}"), "%F0%9F%98%80");
    }

    #[test]
    fn test_key_at_budget_is_not_hashed() {
        let key = "k".repeat(MAX_KEY_LENGTH);
        assert_eq!(wire_key(&key, 0), key);
    }

    #[test]
    fn test_long_key_hashed() {
        let key = "0123456789".repeat(100);
        let wire = wire_key(&key, 0);

        assert_eq!(wire.len(), MAX_KEY_LENGTH);
        assert!(wire.starts_with(&key[..TRUNCATED_PREFIX_LENGTH]));
        assert_eq!(
            wire,
            format!(
                "{}:md5:{}",
                &key[..TRUNCATED_PREFIX_LENGTH],
                hex::encode(Md5::digest(key.as_bytes()))
            )
        );
    }

    #[test]
    fn test_namespace_shrinks_budget() {
        let key = "k".repeat(MAX_KEY_LENGTH - 4);
        assert_eq!(wire_key(&key, 4), key);

        let wire = wire_key(&key, 5);
        assert_eq!(wire.len() + 5, MAX_KEY_LENGTH);
        assert!(wire.contains(DIGEST_SEPARATOR));
    }

    #[test]
    fn test_escaping_counts_toward_budget() {
        // 100 spaces escape to 300 bytes
        let wire = wire_key(&" ".repeat(100), 0);
        assert!(wire.len() <= MAX_KEY_LENGTH);
        assert!(wire.starts_with("%20%20"));
    }

    #[test]
    fn test_long_keys_with_shared_prefix_differ() {
        let base = "x".repeat(400);
        let a = wire_key(&format!("{base}a"), 0);
        let b = wire_key(&format!("{base}b"), 0);
        assert_ne!(a, b);
        assert_eq!(a[..TRUNCATED_PREFIX_LENGTH], b[..TRUNCATED_PREFIX_LENGTH]);
    }

    #[test]
    fn test_oversized_namespace_keeps_digest() {
        let wire = wire_key(&"y".repeat(300), 240);
        assert!(wire.starts_with(DIGEST_SEPARATOR));
    }
}
