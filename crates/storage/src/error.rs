//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Blob does not exist
    #[display("blob not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied by the filesystem
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Blob already exists (creation never overwrites)
    #[display("blob already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Key is empty, contains separators, or is otherwise unusable as a file name
    #[display("invalid blob key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Root directory is unusable (relative, or not a directory)
    #[display("invalid storage root: {_0}")]
    InvalidRoot(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }

    /// Returns `true` if the blob is simply not there.
    ///
    /// Deleting something that is already gone is usually fine; callers use
    /// this to tell that apart from real failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("abc".to_string()).to_string(), "blob not found: abc");
        assert_eq!(ErrorKind::InvalidKey("../x".to_string()).to_string(), "invalid blob key: \"../x\"");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::NotFound("abc".to_string()).is_retryable());
        assert!(!ErrorKind::AlreadyExists("abc".to_string()).is_retryable());
        assert!(ErrorKind::Io(IoError::other("disk on fire")).is_retryable());
    }
}
