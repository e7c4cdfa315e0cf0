//! Cache Key Module
//!
//! The closed set of key shapes accepted by the store, and conversions into it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

use crate::error::{Result, StoreError};

// == Scalar ==
/// A single key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

// == Cache Key ==
/// Application-level identity of a cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A string, integer or boolean
    Scalar(Scalar),
    /// Ordered components
    Sequence(Vec<CacheKey>),
    /// Scalar to scalar pairs, order-insensitive once normalized
    Mapping(Vec<(Scalar, Scalar)>),
    /// Canonical key string of a [`Cacheable`] object
    Canonical(String),
}

impl CacheKey {
    /// Key of an object that knows its own cache key.
    pub fn of<C: Cacheable + ?Sized>(object: &C) -> Self {
        CacheKey::Canonical(object.cache_key())
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::Scalar(Scalar::Str(s))
    }
}

impl From<i64> for CacheKey {
    fn from(i: i64) -> Self {
        CacheKey::Scalar(Scalar::Int(i))
    }
}

// == Cacheable ==
/// Objects exposing a canonical cache key string, used verbatim.
pub trait Cacheable {
    fn cache_key(&self) -> String;
}

// == To Cache Key ==
/// Conversion of application values into a [`CacheKey`].
///
/// Fails with [`StoreError::InvalidKey`] for shapes the store cannot key on.
pub trait ToCacheKey {
    fn to_cache_key(&self) -> Result<CacheKey>;
}

impl ToCacheKey for CacheKey {
    fn to_cache_key(&self) -> Result<CacheKey> {
        Ok(self.clone())
    }
}

impl ToCacheKey for str {
    fn to_cache_key(&self) -> Result<CacheKey> {
        Ok(CacheKey::from(self))
    }
}

impl ToCacheKey for String {
    fn to_cache_key(&self) -> Result<CacheKey> {
        Ok(CacheKey::from(self.as_str()))
    }
}

impl ToCacheKey for bool {
    fn to_cache_key(&self) -> Result<CacheKey> {
        Ok(CacheKey::Scalar(Scalar::Bool(*self)))
    }
}

macro_rules! signed_to_cache_key {
    ($($ty:ty),*) => {$(
        impl ToCacheKey for $ty {
            fn to_cache_key(&self) -> Result<CacheKey> {
                Ok(CacheKey::Scalar(Scalar::Int(i64::from(*self))))
            }
        }
    )*};
}

signed_to_cache_key!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! unsigned_to_cache_key {
    ($($ty:ty),*) => {$(
        impl ToCacheKey for $ty {
            fn to_cache_key(&self) -> Result<CacheKey> {
                i64::try_from(*self)
                    .map(|i| CacheKey::Scalar(Scalar::Int(i)))
                    .map_err(|_| StoreError::InvalidKey(format!("integer {} out of range", self)))
            }
        }
    )*};
}

unsigned_to_cache_key!(u64, usize);

impl<T: ToCacheKey + ?Sized> ToCacheKey for &T {
    fn to_cache_key(&self) -> Result<CacheKey> {
        (**self).to_cache_key()
    }
}

impl<T: ToCacheKey> ToCacheKey for [T] {
    fn to_cache_key(&self) -> Result<CacheKey> {
        self.iter()
            .map(ToCacheKey::to_cache_key)
            .collect::<Result<Vec<_>>>()
            .map(CacheKey::Sequence)
    }
}

impl<T: ToCacheKey> ToCacheKey for Vec<T> {
    fn to_cache_key(&self) -> Result<CacheKey> {
        self.as_slice().to_cache_key()
    }
}

impl<K: ToCacheKey, V: ToCacheKey> ToCacheKey for BTreeMap<K, V> {
    fn to_cache_key(&self) -> Result<CacheKey> {
        mapping_key(self.iter())
    }
}

impl<K: ToCacheKey, V: ToCacheKey, S> ToCacheKey for HashMap<K, V, S> {
    fn to_cache_key(&self) -> Result<CacheKey> {
        mapping_key(self.iter())
    }
}

impl ToCacheKey for Value {
    fn to_cache_key(&self) -> Result<CacheKey> {
        match self {
            Value::String(s) => Ok(CacheKey::from(s.as_str())),
            Value::Bool(b) => b.to_cache_key(),
            Value::Number(n) => n
                .as_i64()
                .map(CacheKey::from)
                .ok_or_else(|| StoreError::InvalidKey(format!("number {n} is not an integer key"))),
            Value::Array(items) => items.to_cache_key(),
            Value::Object(map) => mapping_key(map.iter().map(|(k, v)| (k.as_str(), v))),
            Value::Null => Err(StoreError::InvalidKey("null".to_string())),
        }
    }
}

fn mapping_key<'a, K, V, I>(pairs: I) -> Result<CacheKey>
where
    K: ToCacheKey + ?Sized + 'a,
    V: ToCacheKey + ?Sized + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    pairs
        .map(|(k, v)| Ok((scalar(k.to_cache_key()?)?, scalar(v.to_cache_key()?)?)))
        .collect::<Result<Vec<_>>>()
        .map(CacheKey::Mapping)
}

fn scalar(key: CacheKey) -> Result<Scalar> {
    match key {
        CacheKey::Scalar(s) => Ok(s),
        other => Err(StoreError::InvalidKey(format!(
            "mapping entries must be scalars, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Post {
        id: u32,
    }

    impl Cacheable for Post {
        fn cache_key(&self) -> String {
            format!("posts/{}", self.id)
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!("a".to_cache_key().unwrap(), CacheKey::from("a"));
        assert_eq!(42i32.to_cache_key().unwrap(), CacheKey::from(42));
        assert_eq!(
            true.to_cache_key().unwrap(),
            CacheKey::Scalar(Scalar::Bool(true))
        );
    }

    #[test]
    fn test_cacheable_is_canonical() {
        let key = CacheKey::of(&Post { id: 7 });
        assert_eq!(key, CacheKey::Canonical("posts/7".to_string()));
    }

    #[test]
    fn test_sequence_and_mapping() {
        let seq = vec!["a", "b"].to_cache_key().unwrap();
        assert_eq!(
            seq,
            CacheKey::Sequence(vec![CacheKey::from("a"), CacheKey::from("b")])
        );

        let mut map = BTreeMap::new();
        map.insert("page", 2);
        let key = map.to_cache_key().unwrap();
        assert_eq!(
            key,
            CacheKey::Mapping(vec![(Scalar::Str("page".into()), Scalar::Int(2))])
        );
    }

    #[test]
    fn test_unsigned_out_of_range_is_invalid() {
        assert!(matches!(
            u64::MAX.to_cache_key(),
            Err(StoreError::InvalidKey(_))
        ));
        assert_eq!(7u64.to_cache_key().unwrap(), CacheKey::from(7));
    }

    #[test]
    fn test_json_keys() {
        assert_eq!(json!("x").to_cache_key().unwrap(), CacheKey::from("x"));
        assert!(json!(["x", 1]).to_cache_key().is_ok());
        assert!(json!({"a": 1}).to_cache_key().is_ok());
    }

    #[test]
    fn test_json_invalid_shapes() {
        for bad in [json!(null), json!(1.5), json!({"a": [1, 2]}), json!(["ok", null])] {
            assert!(
                matches!(bad.to_cache_key(), Err(StoreError::InvalidKey(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_mapping_with_nested_key_is_invalid() {
        let mut map = BTreeMap::new();
        map.insert("ids".to_string(), vec![1, 2]);
        assert!(matches!(
            map.to_cache_key(),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
