//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with access metadata.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Entry ==
/// A cached result plus the metadata eviction and diagnostics rely on.
///
/// Wall-clock timestamps are kept for reporting; age is measured against a
/// monotonic instant so clock adjustments cannot expire or revive entries.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    value: V,
    /// Creation timestamp
    insert_time: DateTime<Utc>,
    /// Timestamp of the latest successful hit (or creation)
    access_time: DateTime<Utc>,
    /// Monotonic creation instant used for age checks
    inserted_at: Instant,
    /// Accesses served, the insert counts as the first one
    hit_count: u64,
    /// Time the uncached computation took
    compute_duration: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry with `hit_count = 1`.
    ///
    /// # Arguments
    /// * `value` - The computed result
    /// * `compute_duration` - How long the computation ran
    pub fn new(value: V, compute_duration: Duration) -> Self {
        let now = Utc::now();

        Self {
            value,
            insert_time: now,
            access_time: now,
            inserted_at: Instant::now(),
            hit_count: 1,
            compute_duration,
        }
    }

    // == Record Hit ==
    /// Counts a successful hit and refreshes the access time.
    pub fn record_hit(&mut self) {
        self.hit_count += 1;
        // Never let a wall clock step backwards break access >= insert.
        self.access_time = Utc::now().max(self.insert_time);
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn insert_time(&self) -> DateTime<Utc> {
        self.insert_time
    }

    pub fn access_time(&self) -> DateTime<Utc> {
        self.access_time
    }

    pub fn compute_duration(&self) -> Duration {
        self.compute_duration
    }

    // == Age ==
    /// Time elapsed since the entry was inserted.
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    // == Metadata ==
    /// Copies out everything but the value.
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            insert_time: self.insert_time,
            access_time: self.access_time,
            hit_count: self.hit_count,
            compute_duration: self.compute_duration,
        }
    }
}

// == Entry Metadata ==
/// Read-only copy of an entry's bookkeeping, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub insert_time: DateTime<Utc>,
    pub access_time: DateTime<Utc>,
    pub hit_count: u64,
    pub compute_duration: Duration,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("value".to_string(), Duration::from_millis(5));

        assert_eq!(entry.value(), "value");
        assert_eq!(entry.hit_count(), 1);
        assert_eq!(entry.insert_time(), entry.access_time());
        assert_eq!(entry.compute_duration(), Duration::from_millis(5));
    }

    #[test]
    fn test_record_hit_updates_metadata() {
        let mut entry = CacheEntry::new(7, Duration::ZERO);

        sleep(Duration::from_millis(5));
        entry.record_hit();
        entry.record_hit();

        assert_eq!(entry.hit_count(), 3);
        assert!(entry.access_time() >= entry.insert_time());
    }

    #[test]
    fn test_age_grows() {
        let entry = CacheEntry::new((), Duration::ZERO);

        sleep(Duration::from_millis(20));

        assert!(entry.age() >= Duration::from_millis(20));
    }

    #[test]
    fn test_metadata_copy() {
        let mut entry = CacheEntry::new(1u8, Duration::from_micros(3));
        entry.record_hit();

        let meta = entry.metadata();
        assert_eq!(meta.hit_count, 2);
        assert_eq!(meta.insert_time, entry.insert_time());
        assert_eq!(meta.access_time, entry.access_time());
        assert_eq!(meta.compute_duration, Duration::from_micros(3));
    }
}
