//! Logging setup for binaries built on Mapcycle.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info` for the mapcycle crates.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("mapcycle=info,mapcycle_rotation=info,mapcycle_rpc=info,mapcycle_session=info")
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_timer(fmt::time::uptime()))
        .with(filter)
        .try_init();
}
