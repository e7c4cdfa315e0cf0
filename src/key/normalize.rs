//! Key Normalization
//!
//! Renders a [`CacheKey`] into a single deterministic string.

use percent_encoding::percent_encode_byte;

use crate::key::{CacheKey, Scalar};

/// Separator between sequence elements.
const SEQUENCE_SEPARATOR: &str = "/";

/// Characters escaped in sequence elements.
const SEQUENCE_RESERVED: &[u8] = b"%/";

/// Characters escaped in mapping keys and values.
const PAIR_RESERVED: &[u8] = b"%=&/";

/// Normalizes a key into its string form.
///
/// - canonical keys are used verbatim
/// - a one-element sequence collapses to its element
/// - longer sequences escape and join their normalized elements with `/`
/// - mappings are sorted by the string form of their keys, rendered as
///   escaped `key=value` pairs, then joined like a sequence
///
/// Each element is normalized on its own, so a nested sequence renders like
/// a scalar holding its joined form: `["a", ["b", "c"]]` and `["a", "b/c"]`
/// share a normalized key.
pub fn normalize(key: &CacheKey) -> String {
    match key {
        CacheKey::Canonical(s) => s.clone(),
        CacheKey::Scalar(s) => s.to_string(),
        CacheKey::Sequence(items) => join(items.iter().map(normalize).collect()),
        CacheKey::Mapping(pairs) => join(render_pairs(pairs)),
    }
}

fn join(mut parts: Vec<String>) -> String {
    match parts.len() {
        0 => String::new(),
        1 => parts.swap_remove(0),
        _ => parts
            .iter()
            .map(|p| escape(p, SEQUENCE_RESERVED))
            .collect::<Vec<_>>()
            .join(SEQUENCE_SEPARATOR),
    }
}

fn render_pairs(pairs: &[(Scalar, Scalar)]) -> Vec<String> {
    let mut rendered: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    // Stable: equal key strings keep their insertion order.
    rendered.sort_by(|a, b| a.0.cmp(&b.0));

    rendered
        .into_iter()
        .map(|(k, v)| format!("{}={}", escape(&k, PAIR_RESERVED), escape(&v, PAIR_RESERVED)))
        .collect()
}

/// Percent-escapes the ASCII bytes in `reserved`, leaving everything else
/// (non-ASCII included) untouched. `%` must be listed for the result to stay
/// unambiguous.
fn escape(part: &str, reserved: &[u8]) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match u8::try_from(c) {
            Ok(byte) if reserved.contains(&byte) => out.push_str(percent_encode_byte(byte)),
            _ => out.push(c),
        }
    }
    out
}
