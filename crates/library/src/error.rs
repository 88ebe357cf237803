//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Caller Errors
/// - [`ErrorKind::InvalidName`]
/// - [`ErrorKind::NotFound`]
///
/// ### Dependency Errors
/// - [`ErrorKind::DuplicateKey`] - the generated identifier is already taken
/// - [`ErrorKind::Metadata`]
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File name is empty, or nothing is left of it after sanitizing.
    #[display("file name is empty or invalid")]
    InvalidName,
    #[display("file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Nothing was overwritten; the upload was abandoned.
    #[display("identifier already in use: {_0}")]
    DuplicateKey(#[error(not(source))] String),
    /// The metadata store is unreachable or a query failed.
    #[display("metadata store unavailable")]
    Metadata,
    /// A blob could not be written, read, or removed.
    #[display("blob storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Metadata | Self::Storage)
    }
}
