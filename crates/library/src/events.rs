//! Lifecycle events.
//!
//! Every change to the set of hosted files is announced through
//! [`Event::emit`], so there is one place that decides how those changes are
//! logged.

use crate::ReconcileReport;
use parcel_metadata::FileRecord;

/// Something that happened to a hosted file.
#[derive(Debug)]
pub enum Event<'a> {
    /// A blob was stored and its record inserted.
    Created(&'a FileRecord),
    Renamed { id: &'a str, name: &'a str },
    /// A blob is about to be served; its counter has been incremented.
    Downloaded { id: &'a str, name: &'a str },
    Deleted { id: &'a str },
    /// A reconciler pass finished.
    Reconciled(&'a ReconcileReport),
}

impl Event<'_> {
    /// Log the event.
    pub fn emit(&self) {
        match self {
            Self::Created(record) => tracing::info!(
                id = %record.id,
                name = %record.name,
                size_bytes = record.size_bytes,
                "File uploaded"
            ),
            Self::Renamed { id, name } => tracing::info!(id, name, "File renamed"),
            Self::Downloaded { id, name } => tracing::info!(id, name, "File downloaded"),
            Self::Deleted { id } => tracing::info!(id, "File deleted"),
            Self::Reconciled(report) if report.is_clean() => tracing::info!(
                consistent = report.consistent,
                dry_run = report.dry_run,
                "Blob store and metadata are consistent"
            ),
            Self::Reconciled(report) => tracing::warn!(
                consistent = report.consistent,
                orphan_blobs = report.removed_blobs.len(),
                orphan_records = report.removed_records.len(),
                dry_run = report.dry_run,
                "Reconciled blob store and metadata"
            ),
        }
    }
}
