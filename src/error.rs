//! Unified error type.

use thiserror::Error;

use crate::method::Method;

/// The error type returned by chainmux's fallible operations.
///
/// Application-level errors (401, 404, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// configuration mistakes caught while routes are registered, and
/// infrastructure failures: binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("route `{method} {pattern}` is already registered")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("router is still shared with a group and cannot be frozen")]
    RouterInUse,
}
