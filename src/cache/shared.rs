//! Shared Cache Module
//!
//! Thread-safe get-or-compute cache. A single mutex serializes every access
//! to the store; computations run outside that lock.
//!
//! Misses are single-flight: the first caller to miss on a key becomes its
//! leader and computes, while later callers for the same key block until the
//! leader finishes and then share its value. When the leader fails or panics
//! nothing is cached, the slot is abandoned and every waiter starts over,
//! so one of them takes the lead for the next attempt.
//!
//! A refresh joins the same protocol without the lookup: it waits out any
//! computation already running for the key, then leads its own, so two
//! computations for one key never overlap.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::cache::{CacheSnapshot, CacheStats, CacheStore, EvictionPolicy, Lookup};
use crate::stopwatch::Stopwatch;

// == Flight ==
enum FlightState<V> {
    Pending,
    Ready(V),
    Abandoned,
}

/// Rendezvous between a leader and the callers waiting on its result.
struct Flight<V> {
    state: Mutex<FlightState<V>>,
    done: Condvar,
}

impl<V: Clone> Flight<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Pending),
            done: Condvar::new(),
        }
    }

    fn finish(&self, state: FlightState<V>) {
        *self.state.lock() = state;
        self.done.notify_all();
    }

    /// Blocks until the leader settles. `None` means it gave up.
    fn wait(&self) -> Option<V> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                FlightState::Ready(value) => return Some(value.clone()),
                FlightState::Abandoned => return None,
                FlightState::Pending => {}
            }
            self.done.wait(&mut state);
        }
    }
}

// == Cache Inner ==
struct Inner<K, V> {
    store: CacheStore<K, V>,
    in_flight: HashMap<K, Arc<Flight<V>>>,
}

enum Role<V> {
    Leader(Arc<Flight<V>>),
    Follower(Arc<Flight<V>>),
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Joins the flight running for `key`, or registers a new one to lead.
    fn claim(&mut self, key: &K) -> Role<V> {
        match self.in_flight.get(key) {
            Some(flight) => Role::Follower(Arc::clone(flight)),
            None => {
                let flight = Arc::new(Flight::new());
                self.in_flight.insert(key.clone(), Arc::clone(&flight));
                Role::Leader(flight)
            }
        }
    }
}

// == Cache ==
/// Thread-safe memo table with capacity, hit-count and age limits.
pub struct Cache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache enforcing `policy`.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store: CacheStore::new(policy),
                in_flight: HashMap::new(),
            }),
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing it on a miss.
    ///
    /// `compute` runs at most once per call and never on a hit. Its error is
    /// returned unchanged and leaves no entry behind.
    ///
    /// Only the caller that computes counts a miss; one that shares an
    /// in-flight result counts a hit.
    pub fn get_or_compute<E, F>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        loop {
            let role = {
                let mut inner = self.inner.lock();
                if let Lookup::Hit(value) = inner.store.check_out(key) {
                    return Ok(value);
                }

                let role = inner.claim(key);
                if let Role::Leader(_) = role {
                    inner.store.stats_mut().record_miss();
                }
                role
            };

            match role {
                Role::Leader(flight) => return self.lead(key, flight, compute),
                Role::Follower(flight) => {
                    debug!(?key, "waiting on in-flight computation");
                    if let Some(value) = flight.wait() {
                        self.inner.lock().store.stats_mut().record_coalesced();
                        return Ok(value);
                    }
                    debug!(?key, "in-flight computation abandoned, retrying");
                }
            }
        }
    }

    // == Refresh ==
    /// Computes `key` unconditionally and stores the result, replacing any
    /// existing entry. On failure the existing entry is left untouched.
    ///
    /// A computation already running for `key` is waited out first, and
    /// callers arriving meanwhile wait on this one.
    pub fn refresh<E, F>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        info!(?key, "cache lookup bypassed, refreshing entry");
        loop {
            let role = self.inner.lock().claim(key);
            match role {
                Role::Leader(flight) => return self.lead(key, flight, compute),
                Role::Follower(flight) => {
                    debug!(?key, "refresh waiting on in-flight computation");
                    flight.wait();
                }
            }
        }
    }

    /// Runs the computation for a key this caller leads.
    fn lead<E, F>(&self, key: &K, flight: Arc<Flight<V>>, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut guard = FlightGuard {
            cache: self,
            key,
            flight,
            settled: false,
        };

        let (result, elapsed) = self.run(key, compute);

        let mut inner = self.inner.lock();
        inner.in_flight.remove(key);
        match result {
            Ok(value) => {
                inner.store.insert(key.clone(), value.clone(), elapsed);
                drop(inner);
                guard.flight.finish(FlightState::Ready(value.clone()));
                guard.settled = true;
                Ok(value)
            }
            Err(err) => {
                inner.store.stats_mut().record_failure();
                drop(inner);
                debug!(?key, "computation failed, nothing cached");
                guard.flight.finish(FlightState::Abandoned);
                guard.settled = true;
                Err(err)
            }
        }
    }

    /// Times one invocation of the wrapped computation.
    fn run<E, F>(&self, key: &K, compute: F) -> (Result<V, E>, Duration)
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.inner.lock().store.stats_mut().record_computation();
        debug!(?key, "computing");
        let mut stopwatch = Stopwatch::start_new("compute");
        let result = compute();
        let elapsed = stopwatch.stop();
        debug!(?key, ?elapsed, ok = result.is_ok(), "computation finished");
        (result, elapsed)
    }

    // == Invalidate ==
    /// Removes the entry for `key`, if any.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().store.invalidate(key)
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) -> usize {
        let count = self.inner.lock().store.clear();
        info!(count, "cache cleared");
        count
    }

    /// Checks presence without counting a hit or applying limits.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().store.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().store.stats()
    }

    pub fn policy(&self) -> EvictionPolicy {
        *self.inner.lock().store.policy()
    }

    // == Snapshot ==
    /// Copies out the current state for diagnostics.
    pub fn snapshot(&self, operation: Option<&str>) -> CacheSnapshot<K> {
        self.inner.lock().store.snapshot(operation)
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("policy", &self.policy())
            .field("len", &self.len())
            .finish()
    }
}

// == Flight Guard ==
/// Releases a leader's slot if the computation unwinds before settling.
struct FlightGuard<'a, K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    cache: &'a Cache<K, V>,
    key: &'a K,
    flight: Arc<Flight<V>>,
    settled: bool,
}

impl<K, V> Drop for FlightGuard<'_, K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.settled {
            self.cache.inner.lock().in_flight.remove(self.key);
            self.flight.finish(FlightState::Abandoned);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn unbounded() -> Cache<u32, u32> {
        Cache::new(EvictionPolicy::unbounded())
    }

    #[test]
    fn test_get_or_compute_hit_skips_compute() {
        let cache = unbounded();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(42)
        };

        assert_eq!(cache.get_or_compute(&1, compute), Ok(42));
        assert_eq!(cache.get_or_compute(&1, compute), Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computations, 1);
    }

    #[test]
    fn test_failure_not_cached() {
        let cache = unbounded();

        let result: Result<u32, &str> = cache.get_or_compute(&1, || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(!cache.contains(&1));
        assert_eq!(cache.stats().failures, 1);

        assert_eq!(cache.get_or_compute(&1, || Ok::<_, &str>(5)), Ok(5));
        assert!(cache.contains(&1));
    }

    #[test]
    fn test_refresh_replaces_entry() {
        let cache = unbounded();

        cache.get_or_compute(&1, || Ok::<_, ()>(1)).unwrap();
        assert_eq!(cache.refresh(&1, || Ok::<_, ()>(2)), Ok(2));
        assert_eq!(cache.get_or_compute(&1, || Ok::<_, ()>(3)), Ok(2));
        assert_eq!(cache.stats().computations, 2);
    }

    #[test]
    fn test_refresh_failure_keeps_entry() {
        let cache = unbounded();

        cache.get_or_compute(&1, || Ok::<_, &str>(1)).unwrap();
        assert_eq!(cache.refresh(&1, || Err("down")), Err("down"));
        assert_eq!(cache.get_or_compute(&1, || Ok::<_, &str>(9)), Ok(1));
    }

    #[test]
    fn test_single_flight_concurrent_misses() {
        let cache = Arc::new(unbounded());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compute(&7, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok::<_, ()>(49)
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(49));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        // Late arrivals hit the stored entry, the rest share the flight;
        // either way only the leader counts a miss.
        let stats = cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
        assert!(stats.coalesced <= 7);
        assert_eq!(stats.hit_rate(), 0.875);
    }

    #[test]
    fn test_follower_counts_as_coalesced_hit() {
        let cache = Arc::new(unbounded());
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                cache.get_or_compute(&3, || {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    Ok::<_, ()>(9)
                })
            })
        };

        started.wait();
        assert_eq!(cache.get_or_compute(&3, || Ok::<_, ()>(0)), Ok(9));
        assert_eq!(leader.join().unwrap(), Ok(9));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.computations, 1);
    }

    /// Runs a computation while tracking how many run at once.
    fn tracked(active: &AtomicUsize, peak: &AtomicUsize, value: u32, pause: Duration) -> u32 {
        let running = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(running, Ordering::SeqCst);
        thread::sleep(pause);
        active.fetch_sub(1, Ordering::SeqCst);
        value
    }

    #[test]
    fn test_refresh_waits_for_in_flight_computation() {
        let cache = Arc::new(unbounded());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                cache.get_or_compute(&1, || {
                    started.wait();
                    Ok::<_, ()>(tracked(&active, &peak, 1, Duration::from_millis(80)))
                })
            })
        };

        started.wait();
        thread::sleep(Duration::from_millis(10));
        let refreshed = cache.refresh(&1, || {
            Ok::<_, ()>(tracked(&active, &peak, 2, Duration::ZERO))
        });

        assert_eq!(refreshed, Ok(2));
        assert_eq!(leader.join().unwrap(), Ok(1));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().computations, 2);
        // The refresh ran last, so its value is the one kept.
        assert_eq!(cache.get_or_compute(&1, || Ok::<_, ()>(99)), Ok(2));
    }

    #[test]
    fn test_leader_inserts_after_invalidate_mid_flight() {
        let cache = Arc::new(unbounded());
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                cache.get_or_compute(&4, || {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    Ok::<_, ()>(16)
                })
            })
        };

        started.wait();
        assert!(!cache.invalidate(&4));
        assert_eq!(cache.clear(), 0);

        assert_eq!(leader.join().unwrap(), Ok(16));
        assert!(cache.contains(&4));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_waiters_retry_after_leader_failure() {
        let cache = Arc::new(unbounded());
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                cache.get_or_compute(&1, || {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    Err::<u32, &str>("leader failed")
                })
            })
        };

        started.wait();
        let follower = cache.get_or_compute(&1, || Ok::<_, &str>(10));

        assert_eq!(leader.join().unwrap(), Err("leader failed"));
        assert_eq!(follower, Ok(10));
        assert!(cache.contains(&1));
    }

    #[test]
    fn test_panicking_leader_releases_slot() {
        let cache = unbounded();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            cache.get_or_compute(&1, || -> Result<u32, ()> { panic!("compute panicked") })
        }));
        assert!(outcome.is_err());

        assert_eq!(cache.get_or_compute(&1, || Ok::<_, ()>(3)), Ok(3));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = unbounded();

        cache.get_or_compute(&1, || Ok::<_, ()>(1)).unwrap();
        cache.get_or_compute(&2, || Ok::<_, ()>(2)).unwrap();

        assert!(cache.invalidate(&1));
        assert!(!cache.invalidate(&1));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }
}
