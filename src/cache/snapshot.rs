//! Cache Snapshot Module
//!
//! Copy-out view of a cache for diagnostics. Nothing here refers back into
//! the live cache, so consumers can format or serialize it freely.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{CacheStats, EntryMetadata};

// == Entry Snapshot ==
/// One cached signature with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot<K> {
    pub signature: K,
    #[serde(flatten)]
    pub metadata: EntryMetadata,
}

// == Cache Snapshot ==
/// Configuration, entries (least recently used first) and statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSnapshot<K> {
    /// Name of the wrapped operation, when the cache belongs to one
    pub operation: Option<String>,
    pub max_size: Option<usize>,
    pub max_hits: Option<u64>,
    pub max_age: Option<Duration>,
    pub entries: Vec<EntrySnapshot<K>>,
    pub stats: CacheStats,
}

impl<K> CacheSnapshot<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signatures from least to most recently used.
    pub fn signatures(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.signature)
    }
}

fn limit<T: fmt::Debug>(value: Option<T>) -> String {
    match value {
        Some(value) => format!("{:?}", value),
        None => "None".to_string(),
    }
}

impl<K: fmt::Display> fmt::Display for CacheSnapshot<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache(")?;
        if let Some(operation) = &self.operation {
            writeln!(f, "|   operation={}(),", operation)?;
        }
        writeln!(f, "|   max_size={},", limit(self.max_size))?;
        writeln!(f, "|   max_hits={},", limit(self.max_hits))?;
        writeln!(f, "|   max_age={},", limit(self.max_age))?;
        writeln!(f, "|   entries=[")?;
        for entry in &self.entries {
            let meta = &entry.metadata;
            writeln!(f, "|   |   {}:", entry.signature)?;
            writeln!(f, "|   |   |   insert_time={},", meta.insert_time)?;
            writeln!(f, "|   |   |   access_time={},", meta.access_time)?;
            writeln!(f, "|   |   |   hits={},", meta.hit_count)?;
            writeln!(f, "|   |   |   compute_duration={:?},", meta.compute_duration)?;
        }
        writeln!(f, "|   ],")?;
        writeln!(
            f,
            "|   stats=hits:{} misses:{} evictions:{},",
            self.stats.hits,
            self.stats.misses,
            self.stats.evictions()
        )?;
        write!(f, ")")
    }
}
