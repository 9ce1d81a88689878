//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.
//!
//! Every `get_or_compute` call counts exactly once, as a hit or a miss. A
//! miss is a call that ran the computation itself. A caller that found the
//! key in flight and received the leader's value counts as a hit, and is
//! also tallied in `coalesced`.

use serde::Serialize;

use crate::cache::EvictionReason;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered without computing: from a stored entry or by
    /// sharing an in-flight result
    pub hits: u64,
    /// Lookups that found no usable entry (absent, expired or exhausted)
    pub misses: u64,
    /// Invocations of the wrapped operation
    pub computations: u64,
    /// Invocations that returned an error
    pub failures: u64,
    /// Hits served by another caller's in-flight computation
    pub coalesced: u64,
    /// Entries dropped by the LRU capacity bound
    pub capacity_evictions: u64,
    /// Entries dropped for exceeding `max_age`
    pub expirations: u64,
    /// Entries dropped for reaching `max_hits`
    pub exhaustions: u64,
    /// Entries removed explicitly through `invalidate`
    pub invalidations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_computation(&mut self) {
        self.computations += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// A caller shared an in-flight result; this is also a hit.
    pub fn record_coalesced(&mut self) {
        self.hits += 1;
        self.coalesced += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    // == Record Eviction ==
    /// Increments the counter matching the eviction reason.
    pub fn record_eviction(&mut self, reason: EvictionReason) {
        match reason {
            EvictionReason::Capacity => self.capacity_evictions += 1,
            EvictionReason::Expired => self.expirations += 1,
            EvictionReason::Exhausted => self.exhaustions += 1,
        }
    }

    // == Total Evictions ==
    /// Sum of policy-driven removals, explicit invalidations excluded.
    pub fn evictions(&self) -> u64 {
        self.capacity_evictions + self.expirations + self.exhaustions
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
