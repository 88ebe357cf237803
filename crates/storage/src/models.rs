//! Storage models.

use time::UtcDateTime;

/// Blob metadata returned by storage backends.
///
/// This is whatever the backend can tell about a stored blob without reading
/// it. Used by listing (reconciliation) and stat operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Key of the blob, which is also its file name
    pub key: String,
    /// Blob size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl BlobInfo {
    pub fn new(key: impl Into<String>, size: u64, modified: UtcDateTime) -> Self {
        Self { key: key.into(), size, modified }
    }
}
