use crate::error::SourceError;
use crate::resolver::{Table, TableSource};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, SystemTime};

/// A bounded map whose entries expire after a fixed time-to-live.
///
/// The cache is plain owned state: the caller decides where it lives and how
/// long it lives, there is no process-global instance. When full, inserting
/// evicts the entry closest to expiry.
pub struct TtlCache<K, V> {
    entries: HashMap<K, (SystemTime, V)>,
    ttl: Duration,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        TtlCache {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Look up a live entry; expired entries are treated as absent.
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.entries.get(key) {
            Some((expires_at, value)) if *expires_at > SystemTime::now() => Some(value),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        let now = SystemTime::now();

        // Drop dead entries first; if still full, evict the oldest
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (expires_at, _))| *expires_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(key, (now + self.ttl, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A [`TableSource`] wrapper that memoizes successful fetches.
///
/// Lookup failures are not cached, so a sheet that appears between requests
/// is picked up on the next fetch.
pub struct CachedSource<S> {
    inner: S,
    cache: TtlCache<String, Table>,
}

impl<S: TableSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        CachedSource {
            inner,
            cache: TtlCache::new(ttl, capacity),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TableSource> TableSource for CachedSource<S> {
    fn fetch_table(&mut self, name: &str) -> Result<Table, SourceError> {
        if let Some(table) = self.cache.get(&name.to_string()) {
            return Ok(table.clone());
        }
        let table = self.inner.fetch_table(name)?;
        self.cache.insert(name.to_string(), table.clone());
        Ok(table)
    }

    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }
}
