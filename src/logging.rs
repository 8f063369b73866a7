//! Tracing initialization (spec §10.1), grounded in the teacher's
//! `initialize_tracing` helper: an `EnvFilter` default tuned to this
//! crate's two targets, with `RUST_LOG` taking precedence when set.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "cliffy=info,cliffy_core=info";

/// Installs a global `tracing` subscriber writing to stderr. Call once,
/// before constructing the scheduler, so worker/retry/renderer spans are
/// captured from the start.
pub fn initialize_tracing(verbose: bool) {
    let default_filter = if verbose {
        "cliffy=debug,cliffy_core=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
