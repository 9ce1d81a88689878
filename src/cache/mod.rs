//! Cache Module
//!
//! Provides memoization storage with LRU, hit-count and age eviction.

mod entry;
mod lru;
mod policy;
mod shared;
mod signature;
mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryMetadata};
pub use lru::LruTracker;
pub use policy::{EvictionPolicy, EvictionReason};
pub use shared::Cache;
pub use signature::{ArgValue, Args, CallSignature, CanonicalFloat, KeywordArgs};
pub use snapshot::{CacheSnapshot, EntrySnapshot};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};
