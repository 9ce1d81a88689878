//! Memento demo - cached versus uncached timings
//!
//! Wraps a deliberately slow operation, calls it through the cache and
//! reports how long cold and warm calls take, then prints the cache state.
//!
//! Limits come from `MEMENTO_MAX_SIZE`, `MEMENTO_MAX_HITS` and
//! `MEMENTO_MAX_AGE_MS`; log verbosity from `RUST_LOG`.

use std::thread::sleep;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memento::{stopwatch, CacheConfig, Memoizer};

/// Simulated cost of one uncached call
const WORK: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memento=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("loading cache limits")?;
    info!(
        "Configuration loaded: max_size={:?}, max_hits={:?}, max_age={:?}",
        config.max_size, config.max_hits, config.max_age
    );

    let slow_square = Memoizer::new("slow_square")
        .config(config)
        .wrap_infallible(|n: &u64| {
            sleep(WORK);
            n * n
        })
        .context("building memoized operation")?;

    for n in [3u64, 4, 3, 5, 3, 4] {
        let (value, elapsed) = stopwatch::time("slow_square", || slow_square.get(n));
        info!("slow_square({}) = {} in {:?}", n, value, elapsed);
    }

    let snapshot = slow_square.snapshot();
    let cached: Vec<String> = snapshot.signatures().map(ToString::to_string).collect();
    info!("Cached calls, least recent first: {}", cached.join(", "));
    println!("{}", snapshot);
    println!("{}", serde_json::to_string_pretty(&snapshot.stats)?);

    info!(
        "Hit rate: {:.0}%",
        slow_square.stats().hit_rate() * 100.0
    );
    Ok(())
}
