//! Domain-specific error types and error handling.

use thiserror::Error;

/// Errors raised by an OTP storage backend
///
/// These never cross the failover boundary: the failover store absorbs them
/// and serves the call from the in-memory backend instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Stored OTP record could not be decoded: {message}")]
    Serialization { message: String },
}

impl StorageError {
    /// Shorthand for an unavailable backend
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
