//! Logging setup for the binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `level`.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
