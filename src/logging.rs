//! Logging bootstrap for clients embedding the tracker
//!
//! The library only emits `tracing` events. Clients without their own
//! subscriber can install this one; the filter is read from `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "location2eta=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`.
///
/// Fails instead of panicking when a global subscriber already exists.
pub fn init_logging(default_directive: &str) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| format!("Failed on install the log subscriber: {}", e))
}
