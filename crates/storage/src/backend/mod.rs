//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the unified interface the
//! library uses to put, fetch and remove blobs. Only a local filesystem
//! backend exists today, plus an in-memory one for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::BlobInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use tokio::io::AsyncRead;

pub type BlobInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<BlobInfo>> + Send + 'a>>;
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// Unified interface for blob storage.
///
/// Blobs live in a single flat namespace. Every key is validated with
/// [`validate_key`](crate::validate_key) before it touches the backend, and
/// implementations must enforce that.
///
/// Creation never overwrites: a blob is written once under a freshly
/// generated key and afterwards only ever read or deleted.
///
/// # Examples
///
/// ```
/// use parcel_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of(backend: &dyn StorageBackend, key: &str) -> Result<u64> {
///     if backend.exists(key).await? {
///         Ok(backend.stat(key).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List every blob.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self) -> Result<Vec<BlobInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for every blob.
    ///
    /// Entries that cannot be blobs (directories, broken symlinks, names
    /// that aren't valid keys) are skipped, not reported as errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use parcel_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream();
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.key, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream(&self) -> BlobInfoStream<'_>;

    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create a new blob from a reader, returning the number of bytes written.
    ///
    /// The blob is durable once this returns. Returns
    /// [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if a blob
    /// with the same key is present; the existing blob is left untouched.
    /// If copying fails part way, the partial blob is removed on a
    /// best-effort basis.
    ///
    /// ```no_run
    /// # use parcel_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut data: &[u8] = b"hello";
    /// let written = backend.create("0123456789abcdef0123456789abcdef", &mut data).await?;
    /// assert_eq!(written, 5);
    /// # Ok(())
    /// # }
    /// ```
    async fn create(&self, key: &str, data: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64>;

    /// Read a whole blob into memory.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist. Prefer [`reader()`](Self::reader) for anything that
    /// might be large.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Open a blob for streaming reads.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    async fn reader(&self, key: &str) -> Result<BoxAsyncRead>;

    /// Delete a blob.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get blob metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    async fn stat(&self, key: &str) -> Result<BlobInfo>;
}
