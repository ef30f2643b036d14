use std::fmt;
use std::borrow::Borrow;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::value::{Dict, Source, Value};
use crate::error::Result;

type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            #[derive(::core::fmt::Debug, Clone, Copy)]
            $v struct $T;

            impl $crate::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

#[derive(Clone)]
pub struct Key<'m, 'k, V> {
    map: &'m Metadata,
    key: &'k str,
    _value: PhantomData<fn() -> V>,
}

/// A document's open frontmatter: string keys to [`Value`]s.
///
/// `clone()` is shallow: both handles see the same entries. Use
/// [`Metadata::fork()`] for an independent copy.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub(crate) map: Arc<dashmap::DashMap<Arc<str>, Value, Hasher>>,
}

impl Metadata {
    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.map.get(key).map(|v| v.clone())
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn insert_raw<K, V>(&self, key: K, value: V) -> Option<Value>
        where K: Into<Arc<str>> + Borrow<str>, V: Into<Value>
    {
        let mut value = value.into();
        if let Some(mut existing) = self.map.get_mut(key.borrow()) {
            std::mem::swap(&mut *existing, &mut value);
            Some(value)
        } else {
            self.map.insert(key.into(), value)
        }
    }
}

impl Metadata {
    #[inline(always)]
    pub fn new() -> Self {
        Metadata::default()
    }

    /// A deep, independent copy. Values are immutable, so only the map itself
    /// is duplicated.
    pub fn fork(&self) -> Self {
        let map = dashmap::DashMap::with_capacity_and_hasher(self.len(), Hasher::default());
        for entry in self.map.iter() {
            map.insert(entry.key().clone(), entry.value().clone());
        }

        Metadata { map: Arc::new(map) }
    }

    /// A sorted, point-in-time copy of every entry.
    pub fn snapshot(&self) -> Dict {
        self.map.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?;
        Some(value.clone().try_into().map_err(|_| value))
    }

    /// The value for `K` if present and of the right type.
    #[inline]
    pub fn get_ok<K: MetaKey>(&self, key: K) -> Option<K::Value> {
        self.get(key).and_then(|v| v.ok())
    }

    /// A typed handle for reading `K` as a [`Source`].
    #[inline(always)]
    pub fn metakey<K: MetaKey>(&self, _: K) -> Key<'_, 'static, K::Value> {
        Key { map: self, key: K::KEY, _value: PhantomData }
    }

    pub fn insert<K, V>(&self, _: K, value: V) -> Option<Value>
        where K: MetaKey, V: Into<K::Value>
    {
        self.insert_raw(K::KEY, value.into().into())
    }

    #[inline(always)]
    pub fn append_all(&self, dict: &Dict) {
        for (k, v) in dict {
            self.insert_raw(k.clone(), v.clone());
        }
    }

    /// Inserts each entry of `dict` whose key is not already present.
    pub fn append_absent(&self, dict: &Dict) {
        for (k, v) in dict {
            self.map.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

impl<V> fmt::Debug for Key<'_, '_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("map", &self.map)
            .field("key", &self.key)
            .finish()
    }
}

impl fmt::Display for Metadata {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.snapshot())
    }
}

impl From<Dict> for Metadata {
    fn from(dict: Dict) -> Self {
        let metadata = Metadata::new();
        metadata.append_all(&dict);
        metadata
    }
}

/// Reading a key fails, naming the key, when it is missing or holds a value of
/// the wrong type.
impl<V: TryFrom<Value> + Into<Value> + 'static> Source for Key<'_, '_, V> {
    type Value = V;

    fn read(self) -> Result<Self::Value> {
        let value = self.map.get_raw(self.key)
            .ok_or_else(|| error! {
                "attempted to read nonexistent metadata key",
                "key" => self.key,
            })?;

        let kind = value.kind();
        V::try_from(value)
            .map_err(|_| error! {
                "unexpected metadata value type",
                "key" => self.key,
                "expected" => std::any::type_name::<V>(),
                "actual type" => kind,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_meta_key!(Title: "title" => Arc<str>);

    #[test]
    fn clones_share_forks_do_not() {
        let metadata = Metadata::new();
        metadata.insert(Title, "One");

        let shared = metadata.clone();
        let forked = metadata.fork();
        shared.insert(Title, "Two");
        forked.insert_raw("extra", true);

        assert_eq!(&*metadata.get_ok(Title).unwrap(), "Two");
        assert_eq!(&*forked.get_ok(Title).unwrap(), "One");
        assert!(!metadata.contains_key("extra"));
    }

    #[test]
    fn typed_reads_report_the_key() {
        let metadata = Metadata::new();
        metadata.insert_raw("title", 42u8);

        let error = metadata.metakey(Title).read().unwrap_err().to_string();
        assert!(error.contains("key: title"));
        assert!(error.contains("actual type: number"));

        let missing = Metadata::new().metakey(Title).read().unwrap_err().to_string();
        assert!(missing.contains("nonexistent"));
    }

    #[test]
    fn append_absent_keeps_existing() {
        let metadata = Metadata::new();
        metadata.insert(Title, "Mine");

        let mut defaults = Dict::new();
        defaults.insert("title".into(), Value::from("Default"));
        defaults.insert("author".into(), Value::from("Anon"));
        metadata.append_absent(&defaults);

        let snapshot = metadata.snapshot();
        assert_eq!(snapshot["title"].as_str(), Some("Mine"));
        assert_eq!(snapshot["author"].as_str(), Some("Anon"));
    }
}
