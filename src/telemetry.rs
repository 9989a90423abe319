//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

const DEFAULT_FILTER: &str = "content_search=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once: later calls (and calls after a host runtime
/// already installed a subscriber) are ignored.
pub fn init_tracing(cfg: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let res = match cfg.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    if res.is_ok() {
        tracing::debug!(format = ?cfg.format, "tracing initialized");
    }
}
