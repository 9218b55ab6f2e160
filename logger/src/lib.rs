//! Logging setup for payflow simulations and experiment drivers.
//!
//! The payment loop emits its planning and probe events under the
//! `payflow` target: round summaries and payment outcomes at INFO,
//! per-attempt probe results and solver statistics at DEBUG. The default
//! filter shows the INFO summaries and silences everything else below
//! WARN; set `PAYFLOW_LOG` (or the standard `RUST_LOG`) with
//! [`Targets`]-style directives to change that, e.g.
//! `PAYFLOW_LOG=payflow=debug` to watch every probe.

use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_subscriber::{
    filter::Targets,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

/// The env var consulted for filter directives before falling back to
/// `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "PAYFLOW_LOG";

/// Initialize the global logger for a simulation binary.
///
/// Panics if a logger is already installed.
pub fn init() {
    try_init().expect("Failed to set up the payflow logger");
}

/// Initialize the global logger inside tests.
///
/// Does nothing unless one of the filter env vars is set, so `cargo test`
/// output stays quiet by default, and tolerates another test thread having
/// already won the race to install the subscriber.
pub fn init_for_testing() {
    if env::var_os(LOG_ENV_VAR).is_none()
        && env::var_os("RUST_LOG").is_none()
    {
        return;
    }
    let _ = try_init();
}

/// Install a compact stderr logger filtered by `PAYFLOW_LOG`/`RUST_LOG`.
/// Returns an `Err` if a global subscriber is already set.
pub fn try_init() -> Result<(), TryInitError> {
    // Simulation results go to stdout in driver scripts; keep logs on
    // stderr so the two can be separated.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_writer(io::stderr)
        .with_filter(env_filter());

    tracing_subscriber::registry().with(fmt_layer).try_init()
}

/// The filter from `PAYFLOW_LOG`, then `RUST_LOG`, then the default.
fn env_filter() -> Targets {
    env::var(LOG_ENV_VAR)
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| Targets::from_str(&directives).ok())
        .unwrap_or_else(default_filter)
}

/// Payment and round summaries from the core, warnings from everywhere.
fn default_filter() -> Targets {
    Targets::new()
        .with_default(Level::WARN)
        .with_target("payflow", Level::INFO)
}
