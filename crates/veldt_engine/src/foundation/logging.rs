//! Logging utilities
//!
//! The whole crate logs through the `log` facade; applications pick the sink.

pub use log::{debug, error, info, trace, warn};

/// Initialize the default `env_logger` backend
pub fn init() {
    env_logger::init();
}
