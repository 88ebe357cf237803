//! Metadata Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Database unreachable or a query failed.
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("file record not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A record with this id already exists.
    #[display("duplicate file id: {_0}")]
    DuplicateKey(#[error(not(source))] String),
    /// A stored value could not be converted to or from its model type.
    #[display("invalid metadata: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}

/// Whether a sqlx error is a primary key or unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
