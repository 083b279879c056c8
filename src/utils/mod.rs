//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `stompsub` application.
//!
//! - `error`: the protocol error type and its `ERROR` frame mapping.
//! - `logging`: tracing subscriber setup.

pub mod error;
pub mod logging;

pub use error::BrokerError;

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn test_logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warning");
        logging::init("bogus");
    }
}
