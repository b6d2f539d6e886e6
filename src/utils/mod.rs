//! Utility modules for logging and graceful degradation

pub mod error;
pub mod logging;

pub use error::result_to_option;
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
