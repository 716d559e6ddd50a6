//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Logging setup failures.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install a `fmt` subscriber on stderr filtered by `filter`
/// (`RUST_LOG` syntax).
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is malformed or a subscriber is
/// already installed.
pub fn init(filter: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(filter)?;
    Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init()?;
    Ok(())
}
