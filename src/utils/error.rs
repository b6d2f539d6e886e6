//! Error handling utilities for graceful degradation
//!
//! Helpers for the log-and-continue pattern used during module teardown.

use tracing::warn;

/// Convert a Result to an Option, logging the error
///
/// # Example
/// ```rust
/// use module_host::utils::result_to_option;
///
/// assert_eq!(result_to_option("42".parse::<u32>(), "Failed to parse port"), Some(42));
/// assert_eq!(result_to_option("x".parse::<u32>(), "Failed to parse port"), None);
/// ```
pub fn result_to_option<T, E>(result: Result<T, E>, context: &str) -> Option<T>
where
    E: std::fmt::Display,
{
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}
