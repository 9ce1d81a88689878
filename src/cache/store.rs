//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and policy
//! enforcement. The store itself is not synchronized; [`crate::cache::Cache`]
//! wraps it behind a lock.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::cache::{
    CacheEntry, CacheSnapshot, CacheStats, EntrySnapshot, EvictionPolicy, EvictionReason,
    LruTracker,
};

// == Lookup ==
/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// A valid entry answered the lookup; its metadata has been updated
    Hit(V),
    /// No entry exists for the key
    Miss,
    /// An entry existed but a policy removed it
    Evicted(EvictionReason),
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

// == Cache Store ==
/// Main cache storage with LRU eviction, hit ceilings and age limits.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Performance statistics
    stats: CacheStats,
    /// Limits enforced on lookup and insert
    policy: EvictionPolicy,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store enforcing `policy`.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            policy,
        }
    }

    // == Lookup ==
    /// Looks a key up, applying the age and hit-count limits.
    ///
    /// A valid entry has its hit count and access time updated and becomes
    /// the most recently used. An entry that fails a limit is removed and the
    /// lookup is reported as evicted.
    pub fn lookup(&mut self, key: &K) -> Lookup<V> {
        let lookup = self.check_out(key);
        if !lookup.is_hit() {
            self.stats.record_miss();
        }
        lookup
    }

    /// Same as [`lookup`](Self::lookup) but leaves the miss uncounted, for a
    /// caller that may still be served by an in-flight computation.
    pub(crate) fn check_out(&mut self, key: &K) -> Lookup<V> {
        let Some(entry) = self.entries.get_mut(key) else {
            trace!(?key, "cache miss");
            return Lookup::Miss;
        };

        if let Some(reason) = self.policy.check(entry) {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_eviction(reason);
            self.stats.set_total_entries(self.entries.len());
            debug!(?key, %reason, "cache entry evicted on lookup");
            return Lookup::Evicted(reason);
        }

        entry.record_hit();
        let value = entry.value().clone();
        self.lru.touch(key);
        self.stats.record_hit();
        trace!(?key, hits = entry.hit_count(), "cache hit");
        Lookup::Hit(value)
    }

    // == Insert ==
    /// Stores a freshly computed value as the most recently used entry.
    ///
    /// An existing entry for the key is replaced and its metadata reset.
    /// Returns the keys dropped to honor the capacity bound, oldest first.
    pub fn insert(&mut self, key: K, value: V, compute_duration: Duration) -> Vec<K> {
        self.entries
            .insert(key.clone(), CacheEntry::new(value, compute_duration));
        self.lru.touch(&key);

        let mut evicted = Vec::new();
        while self.policy.is_over_capacity(self.entries.len()) {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.record_eviction(EvictionReason::Capacity);
            evicted.push(oldest);
        }

        if !evicted.is_empty() {
            info!(
                count = evicted.len(),
                max_size = ?self.policy.max_size(),
                "cache reduced to capacity"
            );
        }

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Invalidate ==
    /// Removes one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.record_invalidation();
            self.stats.set_total_entries(self.entries.len());
            debug!(?key, "cache entry invalidated");
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Contains ==
    /// Checks presence without counting a hit or applying limits.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the entry for `key` without touching it.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Iter ==
    /// Iterates entries from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.lru
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| (key, entry)))
    }

    // == Snapshot ==
    /// Copies out configuration, entry metadata and statistics.
    pub fn snapshot(&self, operation: Option<&str>) -> CacheSnapshot<K> {
        CacheSnapshot {
            operation: operation.map(str::to_string),
            max_size: self.policy.max_size(),
            max_hits: self.policy.max_hits(),
            max_age: self.policy.max_age(),
            entries: self
                .iter()
                .map(|(key, entry)| EntrySnapshot {
                    signature: key.clone(),
                    metadata: entry.metadata(),
                })
                .collect(),
            stats: self.stats(),
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Mutable access for counters owned by the synchronized layer.
    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn store(
        max_size: Option<usize>,
        max_hits: Option<u64>,
        max_age: Option<Duration>,
    ) -> CacheStore<u32, String> {
        CacheStore::new(EvictionPolicy::new(max_size, max_hits, max_age).unwrap())
    }

    fn put(store: &mut CacheStore<u32, String>, key: u32) -> Vec<u32> {
        store.insert(key, format!("value{}", key), Duration::ZERO)
    }

    fn keys(store: &CacheStore<u32, String>) -> Vec<u32> {
        store.iter().map(|(key, _)| *key).collect()
    }

    #[test]
    fn test_store_new() {
        let store = store(None, None, None);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_insert_and_lookup() {
        let mut store = store(None, None, None);

        put(&mut store, 1);

        assert_eq!(store.lookup(&1), Lookup::Hit("value1".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek(&1).unwrap().hit_count(), 2);
    }

    #[test]
    fn test_store_lookup_missing() {
        let mut store = store(None, None, None);
        assert_eq!(store.lookup(&1), Lookup::Miss);
    }

    #[test]
    fn test_store_insert_replaces_and_resets() {
        let mut store = store(None, None, None);

        put(&mut store, 1);
        store.lookup(&1);
        store.insert(1, "fresh".to_string(), Duration::from_millis(1));

        let entry = store.peek(&1).unwrap();
        assert_eq!(entry.value(), "fresh");
        assert_eq!(entry.hit_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = store(Some(3), None, None);

        put(&mut store, 1);
        put(&mut store, 2);
        put(&mut store, 3);
        let evicted = put(&mut store, 4);

        assert_eq!(evicted, vec![1]);
        assert_eq!(store.len(), 3);
        assert_eq!(keys(&store), vec![2, 3, 4]);
        assert_eq!(store.stats().capacity_evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_lookup() {
        let mut store = store(Some(3), None, None);

        put(&mut store, 1);
        put(&mut store, 2);
        put(&mut store, 3);
        store.lookup(&1);
        put(&mut store, 4);

        assert!(store.contains(&1));
        assert!(!store.contains(&2));
        assert_eq!(keys(&store), vec![3, 1, 4]);
    }

    #[test]
    fn test_store_hit_exhaustion() {
        let mut store = store(None, Some(2), None);

        put(&mut store, 1);
        assert!(store.lookup(&1).is_hit());
        assert_eq!(store.lookup(&1), Lookup::Evicted(EvictionReason::Exhausted));
        assert!(!store.contains(&1));
        assert_eq!(store.stats().exhaustions, 1);
    }

    #[test]
    fn test_store_age_expiry() {
        let mut store = store(None, None, Some(Duration::from_millis(30)));

        put(&mut store, 1);
        assert!(store.lookup(&1).is_hit());

        sleep(Duration::from_millis(50));

        assert_eq!(store.lookup(&1), Lookup::Evicted(EvictionReason::Expired));
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_invalidate() {
        let mut store = store(None, None, None);

        put(&mut store, 1);

        assert!(store.invalidate(&1));
        assert!(!store.invalidate(&1));
        assert_eq!(store.lookup(&1), Lookup::Miss);
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn test_store_clear() {
        let mut store = store(None, None, None);

        put(&mut store, 1);
        put(&mut store, 2);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(keys(&store), Vec::<u32>::new());
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(None, None, None);

        put(&mut store, 1);
        store.lookup(&1);
        store.lookup(&2);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_snapshot() {
        let mut store = store(Some(5), Some(10), None);

        put(&mut store, 1);
        put(&mut store, 2);
        store.lookup(&1);

        let snapshot = store.snapshot(Some("op"));
        assert_eq!(snapshot.operation.as_deref(), Some("op"));
        assert_eq!(snapshot.max_size, Some(5));
        assert_eq!(snapshot.max_hits, Some(10));
        assert_eq!(snapshot.max_age, None);

        let order: Vec<(u32, u64)> = snapshot
            .entries
            .iter()
            .map(|e| (e.signature, e.metadata.hit_count))
            .collect();
        assert_eq!(order, vec![(2, 1), (1, 2)]);
    }
}
