//! Memento - A memoization layer for deterministic operations
//!
//! Caches results keyed by call arguments, with LRU capacity, per-entry hit
//! ceilings and time-to-live eviction. Concurrent misses on the same
//! arguments share a single computation.

pub mod cache;
pub mod config;
pub mod error;
pub mod memoize;
pub mod stopwatch;

pub use cache::{
    Args, Cache, CacheSnapshot, CacheStats, CallSignature, EvictionPolicy, KeywordArgs,
};
pub use config::CacheConfig;
pub use error::{MementoError, Result};
pub use memoize::{Memoized, Memoizer};
pub use stopwatch::Stopwatch;
