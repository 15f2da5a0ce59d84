//! Tracing subscriber initialization

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a console subscriber filtered by `RUST_LOG` or the configured level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
