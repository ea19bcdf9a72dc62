//! Operational logging setup (bind/accept/startup diagnostics), distinct
//! from the per-connection access-log record in `worker.rs`, which is
//! written directly to stdout to keep its wire format exact.

use tracing_subscriber::EnvFilter;

/// Initializes a `tracing-subscriber` writer on stderr, honoring
/// `RUST_LOG` if set and defaulting to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
