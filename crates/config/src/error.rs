//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these means the operator has to fix their configuration.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("config file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// Extension is not one of `toml`, `yaml`, `yml` or `json`.
    #[display("unsupported config file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A value could not be parsed, or has the wrong type.
    #[display("invalid configuration")]
    Invalid,
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    #[display("invalid setting `{_0}`: {_1}")]
    InvalidSetting(#[error(not(source))] &'static str, #[error(not(source))] &'static str),
    /// The reconciler would treat the database file as an orphan blob.
    #[display("database {} must not be inside the blob directory {}", _0.display(), _1.display())]
    DatabaseInBlobDir(#[error(not(source))] PathBuf, #[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
