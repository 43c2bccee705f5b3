//! In-process caches: a time-expiring key-value tier and a bounded LRU memo.
//!
//! Cache keys are built through [`cache_key`] from a namespace plus
//! identifier plus parameters, so each namespace owns its TTL policy and
//! two callers can never collide by concatenating strings ad hoc.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// One hour — the TTL shared by the search, detail, feature, and
/// recommendation namespaces.
pub const TTL_ONE_HOUR: Duration = Duration::from_secs(3600);

/// Build a cache key from a namespace, an identifier, and extra parameters.
///
/// `cache_key("saavn_search", "blue in green", &["10"])` →
/// `"saavn_search:blue in green:10"`.
pub fn cache_key(namespace: &str, identifier: &str, params: &[&str]) -> String {
    let mut key = String::with_capacity(namespace.len() + identifier.len() + 8);
    key.push_str(namespace);
    key.push(':');
    key.push_str(identifier);
    for p in params {
        key.push(':');
        key.push_str(p);
    }
    key
}

struct TtlEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A time-expiring key-value cache with atomic get/set.
///
/// Expired entries are dropped lazily on lookup.  One instance per value
/// shape — the search, detail, feature, and recommendation tiers each own
/// their own cache rather than sharing an untyped map.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    inner: Mutex<HashMap<String, TtlEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        TtlCache {
            name,
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live entry, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut map = self.inner.lock().ok()?;
        let expired = match map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(cache = self.name, key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(cache = self.name, key, "cache entry expired");
            map.remove(key);
        }
        None
    }

    /// Store a value under the cache's namespace TTL.
    pub fn insert(&self, key: String, value: V) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(
                key,
                TtlEntry {
                    value,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    #[cfg(test)]
    fn force_expire(&self, key: &str) {
        if let Ok(mut map) = self.inner.lock() {
            if let Some(entry) = map.get_mut(key) {
                entry.expires_at = Instant::now() - Duration::from_secs(1);
            }
        }
    }
}

/// A fixed-capacity least-recently-used map.
///
/// Backs the in-process memoization of feature extraction so a
/// long-running process cannot grow the memo without bound.  Not meant to
/// be clever: a `HashMap` plus recency queue is plenty at capacity 50.
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fetch a value and mark it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.map.get(key)?.clone();
        if let Some(pos) = self
            .order
            .iter()
            .position(|k| <K as Borrow<Q>>::borrow(k) == key)
        {
            let k = self.order.remove(pos).expect("position came from iter");
            self.order.push_back(k);
        }
        Some(value)
    }

    /// Insert a value, evicting the least recently used entry at capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.map.contains_key(&key) {
            self.map.insert(key.clone(), value);
            if let Some(pos) = self.order.iter().position(|k| *k == key) {
                self.order.remove(pos);
            }
            self.order.push_back(key);
            return;
        }
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
    }
}
