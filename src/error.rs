//! Process Error Types
//!
//! Everything that can stop `parcel` from starting or keep it from serving.
//! Failures inside a single request never get this far; handlers turn them
//! into notices and status codes.

use derive_more::{Display, Error};

/// A process-level error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for process-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Settings could not be loaded or don't make sense together.
    #[display("could not load configuration")]
    Config,
    #[display("could not open the metadata store")]
    Metadata,
    #[display("could not open the blob store")]
    Storage,
    /// The startup consistency pass failed; nothing is served.
    #[display("reconciliation failed")]
    Reconcile,
    /// An embedded page template is missing or does not compile.
    #[display("invalid page template: {_0}")]
    Template(#[error(not(source))] &'static str),
    #[display("could not render page")]
    Render,
    #[display("HTTP server failed")]
    Server,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Metadata | Self::Storage | Self::Reconcile | Self::Server)
    }
}
