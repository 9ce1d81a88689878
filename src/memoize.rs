//! Memoize Module
//!
//! Wraps an operation in a cache keyed by its arguments. A [`Memoizer`]
//! collects the limits, then [`Memoizer::wrap`] produces a [`Memoized`]
//! value that is called in place of the operation.
//!
//! # Example
//! ```
//! use memento::Memoizer;
//!
//! let square = Memoizer::new("square")
//!     .max_size(100)
//!     .wrap_infallible(|n: &u64| n * n)
//!     .unwrap();
//!
//! assert_eq!(square.get(12), 144);
//! assert_eq!(square.get(12), 144); // served from the cache
//! assert_eq!(square.stats().computations, 1);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{Cache, CacheSnapshot, CacheStats, CallSignature};
use crate::config::CacheConfig;
use crate::error::Result;

// == Memoizer ==
/// Configuration step that turns an operation into a [`Memoized`] one.
#[derive(Debug, Clone)]
pub struct Memoizer {
    name: Arc<str>,
    config: CacheConfig,
}

impl Memoizer {
    /// Starts a memoizer for the operation called `name`, with no limits.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            config: CacheConfig::default(),
        }
    }

    /// Replaces all limits at once.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config = self.config.max_size(max_size);
        self
    }

    pub fn max_hits(mut self, max_hits: u64) -> Self {
        self.config = self.config.max_hits(max_hits);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.config = self.config.max_age(max_age);
        self
    }

    // == Wrap ==
    /// Wraps a fallible operation. Fails if the limits are invalid.
    pub fn wrap<A, V, E, F>(self, operation: F) -> Result<Memoized<A, V, E, F>>
    where
        A: Hash + Eq + Clone + fmt::Debug,
        V: Clone,
        F: Fn(&A) -> std::result::Result<V, E>,
    {
        let policy = self.config.validate()?;
        info!(
            operation = %self.name,
            max_size = ?policy.max_size(),
            max_hits = ?policy.max_hits(),
            max_age = ?policy.max_age(),
            "memoizing operation"
        );

        Ok(Memoized {
            name: self.name,
            operation,
            cache: Cache::new(policy),
            _error: PhantomData,
        })
    }

    // == Wrap Infallible ==
    /// Wraps an operation that cannot fail; call it through [`Memoized::get`].
    #[allow(clippy::type_complexity)]
    pub fn wrap_infallible<A, V, G>(
        self,
        operation: G,
    ) -> Result<Memoized<A, V, Infallible, impl Fn(&A) -> std::result::Result<V, Infallible>>>
    where
        A: Hash + Eq + Clone + fmt::Debug,
        V: Clone,
        G: Fn(&A) -> V,
    {
        self.wrap(move |args: &A| Ok(operation(args)))
    }
}

// == Memoized ==
/// An operation paired with the cache of its results.
pub struct Memoized<A, V, E, F> {
    name: Arc<str>,
    operation: F,
    cache: Cache<CallSignature<A>, V>,
    _error: PhantomData<fn() -> E>,
}

impl<A, V, E, F> Memoized<A, V, E, F>
where
    A: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
    F: Fn(&A) -> std::result::Result<V, E>,
{
    fn signature(&self, args: A) -> CallSignature<A> {
        CallSignature::new(Arc::clone(&self.name), args)
    }

    // == Call ==
    /// Calls through the cache. The operation runs only on a miss, and its
    /// error comes back unchanged without being cached.
    pub fn call(&self, args: A) -> std::result::Result<V, E> {
        let signature = self.signature(args);
        self.cache
            .get_or_compute(&signature, || (self.operation)(signature.args()))
    }

    // == Refresh ==
    /// Calls the operation without consulting the cache, then stores the
    /// result in place of any existing entry.
    pub fn refresh(&self, args: A) -> std::result::Result<V, E> {
        let signature = self.signature(args);
        self.cache
            .refresh(&signature, || (self.operation)(signature.args()))
    }

    /// Drops the cached result for `args`, if any.
    pub fn invalidate(&self, args: &A) -> bool {
        self.cache.invalidate(&self.signature(args.clone()))
    }

    /// Whether a result for `args` is currently stored.
    pub fn contains(&self, args: &A) -> bool {
        self.cache.contains(&self.signature(args.clone()))
    }

    pub fn clear(&self) -> usize {
        self.cache.clear()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // == Snapshot ==
    /// Copies out the limits and every cached signature with its metadata.
    pub fn snapshot(&self) -> CacheSnapshot<CallSignature<A>> {
        self.cache.snapshot(Some(&*self.name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Cache<CallSignature<A>, V> {
        &self.cache
    }
}

impl<A, V, F> Memoized<A, V, Infallible, F>
where
    A: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
    F: Fn(&A) -> std::result::Result<V, Infallible>,
{
    // == Get ==
    /// Calls an infallible operation through the cache.
    pub fn get(&self, args: A) -> V {
        match self.call(args) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<A, V, E, F> fmt::Debug for Memoized<A, V, E, F>
where
    A: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish()
    }
}
