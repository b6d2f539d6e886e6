//! Logging utilities for module hosts
//!
//! Provides simple logging initialization that:
//! - Respects RUST_LOG environment variable
//! - Allows configuration via config file
//! - Optionally emits JSON (feature `json-logging`)
//!
//! # Usage
//!
//! ```rust,no_run
//! use module_host::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Default filter when neither RUST_LOG nor config provides one
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the effective filter: RUST_LOG, then config, then [`DEFAULT_FILTER`]
fn env_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER))
}

/// Initialize logging for the host process
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g., "info", "module_host::module=debug").
///   RUST_LOG takes precedence when set.
///
/// Panics if a global subscriber is already installed; call once at startup.
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .init();
}

/// Initialize logging with JSON output for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .init();
}

/// Initialize logging from [`LoggingConfig`]
///
/// Falls back to plain text when JSON is requested but the `json-logging`
/// feature is off.
///
/// ```rust,no_run
/// use module_host::config::HostConfig;
/// use module_host::utils::init_logging_from_config;
///
/// let config = HostConfig::default();
/// init_logging_from_config(config.logging.as_ref());
/// ```
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.is_some_and(|c| c.json_format) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
