//! Configuration Module
//!
//! Cache limits, set in code or loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{MementoError, Result};

/// Environment variable holding the capacity bound
pub const ENV_MAX_SIZE: &str = "MEMENTO_MAX_SIZE";
/// Environment variable holding the per-entry hit ceiling
pub const ENV_MAX_HITS: &str = "MEMENTO_MAX_HITS";
/// Environment variable holding the entry lifetime in milliseconds
pub const ENV_MAX_AGE_MS: &str = "MEMENTO_MAX_AGE_MS";

/// Cache limits. Every field left unset disables that limit.
///
/// Values are only checked by [`CacheConfig::validate`], which every cache
/// constructor runs before creating anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held at once
    pub max_size: Option<usize>,
    /// Accesses an entry serves before it is recomputed
    pub max_hits: Option<u64>,
    /// Time an entry stays valid after insertion
    pub max_age: Option<Duration>,
}

impl CacheConfig {
    /// Creates an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn max_hits(mut self, max_hits: u64) -> Self {
        self.max_hits = Some(max_hits);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Loads limits from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMENTO_MAX_SIZE` - Maximum cache entries (default: unbounded)
    /// - `MEMENTO_MAX_HITS` - Hits per entry (default: unlimited)
    /// - `MEMENTO_MAX_AGE_MS` - Entry lifetime in milliseconds (default: never expires)
    ///
    /// Unparsable values are rejected rather than ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads limits through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_size = parse_var(&lookup, ENV_MAX_SIZE)?;
        let max_hits = parse_var(&lookup, ENV_MAX_HITS)?;
        let max_age = parse_var::<u64, _>(&lookup, ENV_MAX_AGE_MS)?.map(Duration::from_millis);

        Ok(Self {
            max_size,
            max_hits,
            max_age,
        })
    }

    // == Validate ==
    /// Checks every limit and produces the policy a cache enforces.
    pub fn validate(&self) -> Result<EvictionPolicy> {
        EvictionPolicy::new(self.max_size, self.max_hits, self.max_age)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|_| {
            MementoError::InvalidConfig(format!("{} is not a valid number: {:?}", name, raw))
        }),
        _ => Ok(None),
    }
}
