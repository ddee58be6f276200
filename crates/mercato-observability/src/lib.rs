//! Observability infrastructure for the Mercato marketplace.
//!
//! This crate provides:
//! - `LoggingConfig` / `init_logging` - `tracing` subscriber setup, JSON or
//!   human output, filtered by `RUST_LOG` or the configured level
//! - `RequestId` - Per-request correlation identifier

mod logging;
mod request_id;

pub use logging::*;
pub use request_id::*;

use thiserror::Error;

/// Errors raised while setting up observability.
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// The level or filter directive could not be parsed.
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}
