//! Eviction Policy Module
//!
//! The three independent limits a cache enforces: capacity, hits per entry
//! and age since insertion.

use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheEntry;
use crate::error::{MementoError, Result};

// == Eviction Reason ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Dropped as least recently used to honor `max_size`
    Capacity,
    /// Older than `max_age` when looked up
    Expired,
    /// Reached `max_hits` when looked up
    Exhausted,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EvictionReason::Capacity => "capacity",
            EvictionReason::Expired => "expired",
            EvictionReason::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}

// == Eviction Policy ==
/// Validated, immutable limits. `None` means the limit is not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    max_size: Option<NonZeroUsize>,
    max_hits: Option<NonZeroU64>,
    max_age: Option<Duration>,
}

impl EvictionPolicy {
    // == Constructor ==
    /// Builds a policy, rejecting zero-valued limits.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries held at once
    /// * `max_hits` - Accesses an entry serves before it is recomputed
    /// * `max_age` - Time an entry stays valid after insertion
    pub fn new(
        max_size: Option<usize>,
        max_hits: Option<u64>,
        max_age: Option<Duration>,
    ) -> Result<Self> {
        let max_size = match max_size {
            Some(size) => Some(NonZeroUsize::new(size).ok_or_else(|| {
                MementoError::InvalidConfig("max_size must be positive".to_string())
            })?),
            None => None,
        };

        let max_hits = match max_hits {
            Some(hits) => Some(NonZeroU64::new(hits).ok_or_else(|| {
                MementoError::InvalidConfig("max_hits must be positive".to_string())
            })?),
            None => None,
        };

        if max_age.is_some_and(|age| age.is_zero()) {
            return Err(MementoError::InvalidConfig(
                "max_age must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_size,
            max_hits,
            max_age,
        })
    }

    // == Unbounded ==
    /// A policy with every limit disabled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size.map(NonZeroUsize::get)
    }

    pub fn max_hits(&self) -> Option<u64> {
        self.max_hits.map(NonZeroU64::get)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    // == Over Capacity ==
    /// Returns true when `len` entries exceed the capacity bound.
    pub fn is_over_capacity(&self, len: usize) -> bool {
        self.max_size.is_some_and(|max| len > max.get())
    }

    // == Check ==
    /// Decides whether a looked-up entry may still serve a hit.
    ///
    /// Age is checked before the hit ceiling, so an entry that is both
    /// stale and exhausted is reported as expired.
    pub fn check<V>(&self, entry: &CacheEntry<V>) -> Option<EvictionReason> {
        if let Some(max_age) = self.max_age {
            if entry.age() > max_age {
                return Some(EvictionReason::Expired);
            }
        }

        if let Some(max_hits) = self.max_hits {
            if entry.hit_count() >= max_hits.get() {
                return Some(EvictionReason::Exhausted);
            }
        }

        None
    }
}
