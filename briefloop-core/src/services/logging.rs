//! Logging service

use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

impl LogLevel {
    /// Directive for this crate family, e.g. `briefloop=info`
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "briefloop=error",
            LogLevel::Warn => "briefloop=warn",
            LogLevel::Info => "briefloop=info",
            LogLevel::Debug => "briefloop=debug",
            LogLevel::Trace => "briefloop=trace",
        }
    }
}

/// Build the filter, letting `RUST_LOG` override the configured level.
/// Target matching is by prefix, so `briefloop` also covers `briefloop_core`.
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()))
}

/// Initialize logging with the specified level
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .try_init()
}

/// Log a failed engine operation surfaced to a caller
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "Operation failed"
    );
}
