//! Startup consistency pass between the blob store and the metadata store.

use crate::error::{ErrorKind, Result};
use crate::events::Event;
use exn::ResultExt;
use parcel_metadata::Repository;
use parcel_metadata::error::ErrorKind as MetadataErrorKind;
use parcel_storage::{BackendHandle, StorageBackend};
use std::collections::BTreeSet;
use tracing::instrument;

/// Outcome of a [`reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Blobs that had no record (removed unless this was a dry run).
    pub removed_blobs: Vec<String>,
    /// Records that had no blob (removed unless this was a dry run).
    pub removed_records: Vec<String>,
    /// Ids present on both sides.
    pub consistent: usize,
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Nothing was (or would have been) removed.
    pub fn is_clean(&self) -> bool {
        self.removed_blobs.is_empty() && self.removed_records.is_empty()
    }
}

/// Make the blob store and the metadata store agree.
///
/// Every blob without a record is deleted, then every record without a
/// blob. Both lists are read once up front; anything that disappears on its
/// own in the meantime is not an error. Must run before the service starts
/// taking uploads, as an upload in flight looks exactly like an orphan blob.
///
/// With `dry_run`, the orphans are reported but left alone.
#[instrument(skip_all, fields(backend = backend.name(), dry_run = dry_run))]
pub async fn reconcile(backend: &BackendHandle, repo: &Repository, dry_run: bool) -> Result<ReconcileReport> {
    let db_ids = repo.ids().await.or_raise(|| ErrorKind::Metadata)?;
    let fs_ids: BTreeSet<String> = backend
        .list()
        .await
        .or_raise(|| ErrorKind::Storage)?
        .into_iter()
        .map(|info| info.key)
        .collect();

    let mut report = ReconcileReport {
        consistent: db_ids.intersection(&fs_ids).count(),
        dry_run,
        ..Default::default()
    };

    for id in fs_ids.difference(&db_ids) {
        if !dry_run {
            match backend.delete(id).await {
                Ok(()) => {},
                Err(e) if e.is_not_found() => tracing::debug!(%id, "Orphan blob already gone"),
                Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
            }
        }
        tracing::debug!(%id, dry_run, "Orphan blob");
        report.removed_blobs.push(id.clone());
    }

    for id in db_ids.difference(&fs_ids) {
        if !dry_run {
            match repo.delete(id).await {
                Ok(()) => {},
                Err(e) if matches!(&*e, MetadataErrorKind::NotFound(_)) => {
                    tracing::debug!(%id, "Orphan record already gone")
                },
                Err(e) => return Err(e).or_raise(|| ErrorKind::Metadata),
            }
        }
        tracing::debug!(%id, dry_run, "Orphan record");
        report.removed_records.push(id.clone());
    }

    Event::Reconciled(&report).emit();
    Ok(report)
}
