//! Log subscriber setup for the `portico` binary.
//!
//! Diagnostics go to standard error so that command output on standard
//! output (usage, versions, module lists) stays machine-readable.

use std::{error::Error, io};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "PORTICO_LOG";
/// Filter applied when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
