//! Console logging setup for binaries and tests that use this crate.
//!
//! The library itself only emits `tracing` events; installing a subscriber is left to the
//! application. [`init_logging`] is a convenience for the common case.

use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::LoggingError;

/// Installs a global subscriber with a compact console layer.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"aztecqr=debug"`) is used.
///
/// # Errors
///
/// Fails if the directive does not parse or a global subscriber is already installed.
pub fn init_logging(default_directive: &str) -> Result<(), LoggingError> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(from_env.as_deref(), default_directive)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(layer().compact().with_target(true))
        .try_init()?;
    Ok(())
}

fn build_filter(from_env: Option<&str>, default_directive: &str) -> Result<EnvFilter, LoggingError> {
    let directive = from_env
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default_directive);
    Ok(EnvFilter::try_new(directive)?)
}
