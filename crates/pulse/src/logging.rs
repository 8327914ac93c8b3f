//! Logging initialization.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set. Matches every `pulse*` target.
const DEFAULT_FILTER: &str = "pulse=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// # Panics
///
/// Panics if a global tracing subscriber has already been set. Use
/// [`try_init`] where that can happen (tests, embedding applications).
pub fn init() {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Like [`init`], but returns an error instead of panicking when a
/// subscriber is already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}
