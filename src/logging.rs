//! Tracing subscriber setup with a reloadable level filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use insights_core::config::LoggingConfig;
use insights_core::error::AppError;
use insights_core::result::AppResult;

/// Handle for changing the log filter after initialization.
#[derive(Debug, Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Directives in effect when debug mode is off.
    base: String,
}

impl LogControl {
    /// Raises the filter to `debug` while debug mode is on; otherwise
    /// restores the configured directives.
    pub fn apply_debug_mode(&self, enabled: bool) -> AppResult<()> {
        let directives = if enabled { "debug" } else { self.base.as_str() };
        let filter = EnvFilter::try_new(directives).map_err(|e| {
            AppError::configuration(format!("Invalid log filter '{directives}': {e}"))
        })?;
        self.handle
            .reload(filter)
            .map_err(|e| AppError::internal(format!("Failed to reload log filter: {e}")))
    }
}

/// Initialize tracing/logging. `RUST_LOG` overrides `logging.level`.
pub fn init(config: &LoggingConfig) -> LogControl {
    let base = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| config.level.clone());
    let filter = EnvFilter::try_new(&base).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        _ => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    LogControl { handle, base }
}
