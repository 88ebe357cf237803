//! Upload, list, rename, delete and download.

use crate::error::{ErrorKind, Result};
use crate::events::Event;
use crate::reconcile::{ReconcileReport, reconcile};
use crate::{FileId, format_bytes, sanitize_filename};
use exn::{OptionExt, ResultExt};
use parcel_metadata::error::ErrorKind as MetadataErrorKind;
use parcel_metadata::{FileRecord, Repository};
use parcel_storage::backend::BoxAsyncRead;
use parcel_storage::error::ErrorKind as StorageErrorKind;
use parcel_storage::{BackendHandle, StorageBackend};
use time::UtcDateTime;
use tokio::io::AsyncRead;

/// A blob ready to be served, with its counter already incremented.
pub struct Download {
    /// Blob key, which is the file's id.
    pub key: String,
    /// Display name to offer the client.
    pub name: String,
    pub size_bytes: u64,
    pub reader: BoxAsyncRead,
}

/// The hosted files: blobs plus their records.
///
/// Cheap to clone; clones share the same backend and connection pool.
#[derive(Clone)]
pub struct Library {
    backend: BackendHandle,
    repo: Repository,
}

impl Library {
    pub fn new(backend: BackendHandle, repo: Repository) -> Self {
        Self { backend, repo }
    }

    /// All files, newest upload first.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.repo.list_all().await.or_raise(|| ErrorKind::Metadata)
    }

    /// A single file's record.
    pub async fn get(&self, id: &str) -> Result<FileRecord> {
        let id = FileId::parse(id)?;
        self.repo.get(id.as_str()).await.map_err(|e| Self::metadata_error(e, &id))
    }

    /// Store a new file.
    ///
    /// The blob is written (and synced) first; the record is only inserted
    /// once that has succeeded. An empty name, or one that sanitizes to
    /// nothing, is rejected before either store is touched.
    ///
    /// If the record insert fails the blob is left where it is. The next
    /// [`reconcile`] pass removes it.
    pub async fn upload(&self, filename: &str, data: &mut (dyn AsyncRead + Send + Unpin)) -> Result<FileRecord> {
        self.upload_at(filename, data, UtcDateTime::now()).await
    }

    pub(crate) async fn upload_at(
        &self,
        filename: &str,
        data: &mut (dyn AsyncRead + Send + Unpin),
        instant: UtcDateTime,
    ) -> Result<FileRecord> {
        let name = sanitize_filename(filename).ok_or_raise(|| ErrorKind::InvalidName)?;
        let id = FileId::generate_at(&name, instant);

        let size_bytes = match self.backend.create(id.as_str(), data).await {
            Ok(written) => written,
            Err(e) if matches!(&*e, StorageErrorKind::AlreadyExists(_)) => {
                exn::bail!(ErrorKind::DuplicateKey(id.to_string()))
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
        };

        let record = FileRecord {
            id: id.to_string(),
            name,
            // The stored date has whole seconds only; match it so the
            // returned record equals what a later `get` reads back.
            upload_date: instant.replace_nanosecond(0).unwrap_or(instant),
            size: format_bytes(size_bytes),
            size_bytes,
            downloads: 0,
        };
        match self.repo.insert(&record).await {
            Ok(()) => {},
            Err(e) if matches!(&*e, MetadataErrorKind::DuplicateKey(_)) => {
                exn::bail!(ErrorKind::DuplicateKey(record.id))
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Metadata),
        }
        Event::Created(&record).emit();
        Ok(record)
    }

    /// Change a file's display name, returning the name as stored.
    /// Nothing else about the file changes.
    pub async fn rename(&self, id: &str, new_name: &str) -> Result<String> {
        let id = FileId::parse(id)?;
        let name = sanitize_filename(new_name).ok_or_raise(|| ErrorKind::InvalidName)?;
        self.repo.update_name(id.as_str(), &name).await.map_err(|e| Self::metadata_error(e, &id))?;
        Event::Renamed { id: id.as_str(), name: &name }.emit();
        Ok(name)
    }

    /// Remove a file: blob first, then its record.
    ///
    /// An unknown id is [`NotFound`](ErrorKind::NotFound) and changes
    /// nothing. A record whose blob has already gone is still removed.
    /// Returns the record as it was before removal.
    pub async fn delete(&self, id: &str) -> Result<FileRecord> {
        let id = FileId::parse(id)?;
        // Confirm the record exists before touching the blob.
        let record = self.repo.get(id.as_str()).await.map_err(|e| Self::metadata_error(e, &id))?;
        match self.backend.delete(id.as_str()).await {
            Ok(()) => {},
            Err(e) if e.is_not_found() => tracing::warn!(%id, "Blob already missing; removing record anyway"),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
        }
        match self.repo.delete(id.as_str()).await {
            Ok(()) => {},
            Err(e) if matches!(&*e, MetadataErrorKind::NotFound(_)) => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::Metadata),
        }
        Event::Deleted { id: id.as_str() }.emit();
        Ok(record)
    }

    /// Open a file for download and count it.
    ///
    /// The counter is only incremented once the blob has been opened, so a
    /// missing blob is [`NotFound`](ErrorKind::NotFound) and not counted.
    pub async fn record_download(&self, id: &str) -> Result<Download> {
        let id = FileId::parse(id)?;
        let record = self.repo.get(id.as_str()).await.map_err(|e| Self::metadata_error(e, &id))?;
        let reader = match self.backend.reader(id.as_str()).await {
            Ok(reader) => reader,
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "Record exists but its blob is missing");
                exn::bail!(ErrorKind::NotFound(id.to_string()))
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
        };
        self.repo.increment_downloads(id.as_str()).await.map_err(|e| Self::metadata_error(e, &id))?;
        Event::Downloaded { id: id.as_str(), name: &record.name }.emit();
        Ok(Download {
            key: record.id,
            name: record.name,
            size_bytes: record.size_bytes,
            reader,
        })
    }

    /// Run a [`reconcile`] pass over this library's stores.
    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconcileReport> {
        reconcile(&self.backend, &self.repo, dry_run).await
    }

    fn metadata_error(err: parcel_metadata::error::Error, id: &FileId) -> crate::error::Error {
        match &*err {
            MetadataErrorKind::NotFound(_) => err.raise(ErrorKind::NotFound(id.to_string())),
            _ => err.raise(ErrorKind::Metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_metadata::Database;
    use parcel_storage::backend::{LocalBackend, MockBackend};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use time::macros::utc_datetime;
    use tokio::io::{AsyncReadExt, ReadBuf};

    /// Hands out `data`, then fails like an upload cut off half way.
    struct BrokenReader {
        data: &'static [u8],
    }
    impl AsyncRead for BrokenReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            if self.data.is_empty() {
                return Poll::Ready(Err(std::io::Error::other("client went away")));
            }
            let n = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Poll::Ready(Ok(()))
        }
    }

    async fn library() -> (Library, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::default());
        let db = Database::connect_in_memory().await.unwrap();
        let library = Library::new(mock.clone(), Repository::from(&db));
        (library, mock)
    }

    #[tokio::test]
    async fn test_upload_download_rename_delete() {
        let (library, mock) = library().await;
        let content = vec![7u8; 1_048_576];

        let uploaded = library.upload("report.pdf", &mut content.as_slice()).await.unwrap();
        assert_eq!(uploaded.name, "report.pdf");
        assert_eq!(uploaded.size_bytes, 1_048_576);
        assert_eq!(uploaded.size, "1.00 MB");
        assert_eq!(uploaded.downloads, 0);
        assert_eq!(library.get(&uploaded.id).await.unwrap(), uploaded);
        assert_eq!(mock.keys().await, vec![uploaded.id.clone()]);

        let mut download = library.record_download(&uploaded.id).await.unwrap();
        assert_eq!(download.key, uploaded.id);
        assert_eq!(download.name, "report.pdf");
        let mut served = Vec::new();
        download.reader.read_to_end(&mut served).await.unwrap();
        assert_eq!(served, content);
        assert_eq!(library.get(&uploaded.id).await.unwrap().downloads, 1);

        assert_eq!(library.rename(&uploaded.id, "final.pdf").await.unwrap(), "final.pdf");
        let renamed = library.get(&uploaded.id).await.unwrap();
        assert_eq!(renamed.name, "final.pdf");
        assert_eq!(renamed.size, "1.00 MB");
        assert_eq!(renamed.size_bytes, 1_048_576);
        assert_eq!(renamed.downloads, 1);

        assert_eq!(library.delete(&uploaded.id).await.unwrap().name, "final.pdf");
        let err = library.get(&uploaded.id).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(mock.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_filename_touches_nothing() {
        let (library, mock) = library().await;
        for name in ["", "   ", "..", "/"] {
            let err = library.upload(name, &mut &b"data"[..]).await.unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidName), "{name:?}");
        }
        assert!(mock.keys().await.is_empty());
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_sanitizes_name() {
        let (library, _mock) = library().await;
        let record = library.upload("../../etc/passwd", &mut &b"x"[..]).await.unwrap();
        assert_eq!(record.name, "_.._etc_passwd");
    }

    #[tokio::test]
    async fn test_collision_never_overwrites() {
        let (library, mock) = library().await;
        let instant = utc_datetime!(2026-03-14 15:09:26.5);
        let first = library.upload_at("same.txt", &mut &b"first"[..], instant).await.unwrap();

        let err = library.upload_at("same.txt", &mut &b"second"[..], instant).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateKey(id) if *id == first.id));
        assert_eq!(mock.read(&first.id).await.unwrap(), b"first");
        assert_eq!(library.list().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_upload_date_is_whole_seconds() {
        let (library, _mock) = library().await;
        let record = library.upload_at("a.txt", &mut &b"a"[..], utc_datetime!(2026-03-14 15:09:26.999)).await.unwrap();
        assert_eq!(record.upload_date, utc_datetime!(2026-03-14 15:09:26));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (library, _mock) = library().await;
        let old = library.upload_at("old.txt", &mut &b"o"[..], utc_datetime!(2026-01-01 00:00:00)).await.unwrap();
        let new = library.upload_at("new.txt", &mut &b"n"[..], utc_datetime!(2026-02-01 00:00:00)).await.unwrap();
        let ids: Vec<String> = library.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_changes_nothing() {
        let (library, mock) = library().await;
        let kept = library.upload("kept.txt", &mut &b"k"[..]).await.unwrap();

        let unknown = FileId::generate("never uploaded");
        let err = library.delete(unknown.as_str()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = library.delete("not-an-id").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));

        assert_eq!(mock.keys().await, vec![kept.id.clone()]);
        assert_eq!(library.list().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_removes_record() {
        let (library, mock) = library().await;
        let record = library.upload("gone.txt", &mut &b"g"[..]).await.unwrap();
        mock.delete(&record.id).await.unwrap();

        library.delete(&record.id).await.unwrap();
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_of_missing_blob_is_not_counted() {
        let (library, mock) = library().await;
        let record = library.upload("gone.txt", &mut &b"g"[..]).await.unwrap();
        mock.delete(&record.id).await.unwrap();

        let err = library.record_download(&record.id).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert_eq!(library.get(&record.id).await.unwrap().downloads, 0);
    }

    #[tokio::test]
    async fn test_rename_rejects_empty_and_unknown() {
        let (library, _mock) = library().await;
        let record = library.upload("a.txt", &mut &b"a"[..]).await.unwrap();

        let err = library.rename(&record.id, "  ").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName));
        assert_eq!(library.get(&record.id).await.unwrap().name, "a.txt");

        let unknown = FileId::generate("b.txt");
        let err = library.rename(unknown.as_str(), "b.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_interrupted_upload_stores_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("uploads", temp_dir.path()).unwrap());
        let db = Database::connect_in_memory().await.unwrap();
        let library = Library::new(backend.clone(), Repository::from(&db));

        let err = library.upload("big.iso", &mut BrokenReader { data: b"some of it" }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        assert!(backend.list().await.unwrap().is_empty());
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_without_record_is_left_for_reconcile() {
        let mock = Arc::new(MockBackend::default());
        let db = Database::connect_in_memory().await.unwrap();
        let library = Library::new(mock.clone(), Repository::from(&db));
        db.close().await;

        let err = library.upload("late.txt", &mut &b"late"[..]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Metadata));
        let stranded = mock.keys().await;
        assert_eq!(stranded.len(), 1);

        // Next start, with a working metadata store over the same blobs.
        let db = Database::connect_in_memory().await.unwrap();
        let library = Library::new(mock.clone(), Repository::from(&db));
        let report = library.reconcile(false).await.unwrap();
        assert_eq!(report.removed_blobs, stranded);
        assert!(mock.keys().await.is_empty());
    }
}
