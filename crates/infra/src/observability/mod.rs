//! Logging setup
//!
//! Installs a global `tracing` subscriber. Filtering follows `RUST_LOG` and
//! defaults to `info`; output is human-readable or one JSON object per line.

use courier_domain::{impl_domain_label_conversions, CourierError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_domain_label_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// Logs go to stderr so stdout stays free for command output.
///
/// # Errors
/// `CourierError::Internal` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| CourierError::Internal(format!("Failed to initialise tracing: {e}")))
}
