//! Local filesystem storage backend.
//!
//! Blobs are plain files directly inside a configured root directory. All
//! access goes through `tokio::fs` for async I/O.

use crate::backend::{BlobInfoStream, BoxAsyncRead};
use crate::error::ErrorKind;
use crate::{BlobInfo, StorageBackend, error::Result, key::validate as validate_key};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs::{self, DirEntry, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

enum ListEntry {
    Blob(BlobInfo),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores blobs as files in a single directory. Subdirectories are never
/// created, and any that appear (put there by hand, say) are ignored.
///
/// # Examples
///
/// ```no_run
/// use parcel_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("uploads", "/var/lib/parcel/uploads")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Directory holding the blobs
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the blob directory; created if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root.display().to_string()));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path of a blob, validating its key.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn blob_info(key: &str, metadata: &Metadata) -> Result<BlobInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(BlobInfo::new(key, metadata.len(), UtcDateTime::from(modified)))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Decide whether a directory entry is a blob. Keeps the `?` operator
    /// usable, which it isn't inside the `stream!` body.
    async fn process_entry(&self, entry: DirEntry) -> Result<ListEntry> {
        let file_name = entry.file_name();
        let Some(key) = file_name.to_str() else {
            tracing::warn!(backend = %self.name, name = ?file_name, "Skipping blob store entry with non UTF-8 name");
            return Ok(ListEntry::Skip);
        };
        if validate_key(key).is_err() {
            return Ok(ListEntry::Skip);
        }
        // `DirEntry::metadata` does not follow symlinks; `fs::metadata` does,
        // which is what we want for a symlinked blob.
        let metadata = match fs::metadata(entry.path()).await {
            Ok(metadata) => metadata,
            // Broken symlink, or deleted between listing and stat.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ListEntry::Skip),
            Err(e) => exn::bail!(Self::map_io_error(e, key)),
        };
        if !metadata.is_file() {
            tracing::debug!(backend = %self.name, key, "Skipping non-file entry in blob store");
            return Ok(ListEntry::Skip);
        }
        Ok(ListEntry::Blob(Self::blob_info(key, &metadata)?))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> BlobInfoStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                // Root removed out from under us: nothing stored.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root.display().to_string())));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(exn::Exn::from(Self::map_io_error(e, &self.root.display().to_string())));
                        break;
                    },
                };
                match self.process_entry(entry).await {
                    Ok(ListEntry::Blob(info)) => yield Ok(info),
                    Ok(ListEntry::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn create(&self, key: &str, data: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64> {
        let abs_path = self.absolute_path(key)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs_path)
            .await
            .map_err(|e| Self::map_io_error(e, key))?;
        let written = async {
            let written = tokio::io::copy(data, &mut file).await?;
            file.flush().await?;
            // The caller records metadata as soon as we return; the bytes
            // must be on disk before that happens.
            file.sync_all().await?;
            Ok::<_, std::io::Error>(written)
        }
        .await;
        match written {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&abs_path).await {
                    tracing::warn!(backend = %self.name, key, error = %cleanup, "Could not remove partially written blob");
                }
                Err(exn::Exn::from(Self::map_io_error(e, key)))
            },
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn reader(&self, key: &str) -> Result<BoxAsyncRead> {
        let abs_path = self.absolute_path(key)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        Ok(Box::pin(file))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn stat(&self, key: &str) -> Result<BlobInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Self::blob_info(key, &metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, ReadBuf};

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    /// Hands out `data`, then fails like a dropped connection.
    struct BrokenReader {
        data: &'static [u8],
    }
    impl AsyncRead for BrokenReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            if self.data.is_empty() {
                return Poll::Ready(Err(std::io::Error::other("connection reset")));
            }
            let n = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Poll::Ready(Ok(()))
        }
    }

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("uploads", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("uploads");
        LocalBackend::new("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("not-a-dir");
        std::fs::write(&root, b"data").unwrap();
        assert!(LocalBackend::new("name", &root).is_err());
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (_dir, backend) = backend();
        let mut data: &[u8] = b"Hello, world!";
        let written = backend.create(KEY, &mut data).await.unwrap();
        assert_eq!(written, 13);
        assert_eq!(backend.read(KEY).await.unwrap(), b"Hello, world!");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing_behind() {
        let (dir, backend) = backend();
        let mut reader = BrokenReader { data: b"the first half of" };
        assert!(backend.create(KEY, &mut reader).await.is_err());

        assert!(!backend.exists(KEY).await.unwrap());
        assert!(backend.list().await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let (_dir, backend) = backend();
        let mut first: &[u8] = b"first";
        backend.create(KEY, &mut first).await.unwrap();
        let mut second: &[u8] = b"second";
        let err = backend.create(KEY, &mut second).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(backend.read(KEY).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_reader_streams_contents() {
        let (_dir, backend) = backend();
        let mut data: &[u8] = b"0123456789";
        backend.create(KEY, &mut data).await.unwrap();
        let mut reader = backend.reader(KEY).await.unwrap();
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await.unwrap();
        assert_eq!(buffer, b"0123456789");
    }

    #[tokio::test]
    async fn test_exists() {
        let (_dir, backend) = backend();
        assert!(!backend.exists(KEY).await.unwrap());
        let mut data: &[u8] = b"data";
        backend.create(KEY, &mut data).await.unwrap();
        assert!(backend.exists(KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, backend) = backend();
        let mut data: &[u8] = b"data";
        backend.create(KEY, &mut data).await.unwrap();
        backend.delete(KEY).await.unwrap();
        assert!(!backend.exists(KEY).await.unwrap());
        // Deleting a missing blob reports NotFound
        let err = backend.delete(KEY).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stat() {
        let (_dir, backend) = backend();
        let mut data: &[u8] = b"Hello, world!";
        backend.create(KEY, &mut data).await.unwrap();
        let info = backend.stat(KEY).await.unwrap();
        assert_eq!(info.key, KEY);
        assert_eq!(info.size, 13);
        let err = backend.stat("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_dir, backend) = backend();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let (dir, backend) = backend();
        std::fs::write(dir.path().join("aaaa"), b"one").unwrap();
        std::fs::write(dir.path().join("bbbb"), b"two").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("cccc"), b"three").unwrap();
        let mut keys: Vec<_> = backend.list().await.unwrap().into_iter().map(|b| b.key).collect();
        keys.sort();
        assert_eq!(keys, vec!["aaaa".to_string(), "bbbb".to_string()]);
    }

    #[tokio::test]
    async fn test_key_security() {
        let (_dir, backend) = backend();
        let mut data: &[u8] = b"data";
        assert!(backend.read("../etc/passwd").await.is_err());
        assert!(backend.create("../escape", &mut data).await.is_err());
        assert!(backend.create("nested/key", &mut data).await.is_err());
        assert!(backend.delete("..").await.is_err());
    }
}
