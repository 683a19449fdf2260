//! Development-time tracing for debugging resolution and readers.
//!
//! Diagnostics only: controlled by `RUST_LOG`, written to stderr, never part
//! of the data this crate returns.

use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is unset: progress from this crate,
/// warnings from everything else.
const DEFAULT_FILTER: &str = "warn,epxres=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Example
/// ```bash
/// RUST_LOG=epxres=debug epxctl runs --job-key simpleflu
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
