//! Unified error type for infrastructure failures.

use thiserror::Error;

/// The error type returned by the service's fallible startup operations.
///
/// Per-request failures are expressed as HTTP [`Response`](crate::Response)
/// values, not as `Error`s. This type covers reading configuration, binding
/// to a port, and accepting connections.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}
