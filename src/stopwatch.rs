//! Stopwatch Module
//!
//! Small named timer for benchmarking calls, cached or not. It knows nothing
//! about caches: it only measures what runs between `start` and `stop`.

use std::time::{Duration, Instant};

use tracing::debug;

// == Stopwatch ==
/// Measures wall-clock time between a start and a stop.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    name: String,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Stopwatch {
    // == Constructor ==
    /// Creates a stopped stopwatch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: None,
            elapsed: None,
        }
    }

    /// Creates a stopwatch that is already running.
    pub fn start_new(name: impl Into<String>) -> Self {
        let mut stopwatch = Self::new(name);
        stopwatch.start();
        stopwatch
    }

    // == Start ==
    /// Starts (or restarts) timing, discarding any previous measurement.
    pub fn start(&mut self) -> &mut Self {
        self.started_at = Some(Instant::now());
        self.elapsed = None;
        self
    }

    // == Stop ==
    /// Stops timing and returns the measured duration.
    ///
    /// Stopping a stopwatch that never started measures zero; stopping it
    /// twice returns the first measurement.
    pub fn stop(&mut self) -> Duration {
        if let Some(elapsed) = self.elapsed {
            return elapsed;
        }

        let elapsed = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.elapsed = Some(elapsed);
        debug!(name = %self.name, ?elapsed, "stopwatch stopped");
        elapsed
    }

    // == Elapsed ==
    /// The stopped measurement, or the running time so far.
    pub fn elapsed(&self) -> Duration {
        match (self.elapsed, self.started_at) {
            (Some(elapsed), _) => elapsed,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.elapsed.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// == Time ==
/// Runs `f` and returns its output with the time it took.
pub fn time<T>(name: &str, f: impl FnOnce() -> T) -> (T, Duration) {
    let mut stopwatch = Stopwatch::start_new(name);
    let output = f();
    (output, stopwatch.stop())
}
