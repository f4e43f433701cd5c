//! Process-wide logging setup.
//!
//! Library code logs through the `log` macros. `init_logging` routes those
//! records into a `tracing` fmt subscriber so embedding applications get one
//! stream with span context.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log bridge already installed: {0}")]
    Bridge(#[from] log::SetLoggerError),

    #[error("global subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (for example
/// `"reelname=debug,info"`) is used. A second call returns an error and leaves the
/// first subscriber in place, so callers that may race can ignore it.
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<(), LoggingError> {
    tracing_log::LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_target(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_current_span(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    log::debug!("Logging initialised ({:?})", format);
    Ok(())
}
