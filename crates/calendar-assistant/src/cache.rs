//! Time-to-live cache for provider query results.
//!
//! Callers pass the current `Instant` explicitly so expiry is deterministic in tests.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Values keyed by query parameters, each valid for `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it is younger than the TTL; an expired entry is evicted.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        let fresh = self
            .entries
            .get(key)
            .map(|e| now.saturating_duration_since(e.stored_at) < self.ttl)?;
        if fresh {
            self.entries.get(key).map(|e| e.value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
