//! Error types for the watch client.
//!
//! Failed connection attempts are not errors: they are logged and retried
//! until the daemon appears or the client is cancelled. What surfaces here
//! is failure on an established link or while encoding output.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use thiserror::Error;

/// Errors that can occur while watching the daemon.
#[derive(Error, Debug)]
pub enum ClientError {
    /// I/O failure on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode an event as JSON.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the client.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ClientError = io_err.into();
        assert!(matches!(err, ClientError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
