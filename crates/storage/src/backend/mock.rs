//! In-memory storage backend for testing.

use super::{BlobInfoStream, BoxAsyncRead};
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use crate::{BlobInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use time::UtcDateTime;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Blobs are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation.
///
/// # Examples
///
/// ```
/// use parcel_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_blobs([("abc", b"hello")]);
/// assert!(backend.exists("abc").await?);
///
/// let mut data: &[u8] = b"data...";
/// backend.create("def", &mut data).await?;
/// assert!(backend.exists("def").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, (UtcDateTime, Vec<u8>)>>,
    fail_listing: AtomicBool,
}

impl MockBackend {
    /// Create a mock backend pre-populated with blobs.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_blobs(blobs: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (key, data) in blobs {
            let key = key.into();
            if validate_key(&key).is_err() {
                panic!("MockBackend::with_blobs: invalid key {key:?}");
            }
            map.insert(key, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            fail_listing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent listing fail with a backend error.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Keys currently held, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let blobs: [(&str, &str); 0] = [];
        Self::with_blobs(blobs)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> BlobInfoStream<'_> {
        Box::pin(stream! {
            if self.fail_listing.load(Ordering::SeqCst) {
                yield Err(exn::Exn::from(ErrorKind::BackendError("listing disabled".to_string())));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<BlobInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .map(|(key, (inserted, data))| BlobInfo::new(key.clone(), data.len() as u64, *inserted))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(key))
    }

    async fn create(&self, key: &str, data: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64> {
        let key = validate_key(key)?;
        if self.storage.read().await.contains_key(key) {
            exn::bail!(ErrorKind::AlreadyExists(key.to_string()));
        }
        let mut buffer = Vec::new();
        data.read_to_end(&mut buffer).await.map_err(ErrorKind::Io)?;
        let written = buffer.len() as u64;
        let mut guard = self.storage.write().await;
        // Re-check under the write lock; another task may have raced us.
        if guard.contains_key(key) {
            exn::bail!(ErrorKind::AlreadyExists(key.to_string()));
        }
        guard.insert(key.to_string(), (UtcDateTime::now(), buffer));
        Ok(written)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_inserted, data) = self
            .storage
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        Ok(data)
    }

    async fn reader(&self, key: &str) -> Result<BoxAsyncRead> {
        let data = self.read(key).await?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        match self.storage.write().await.remove(key) {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::NotFound(key.to_string())),
        }
    }

    async fn stat(&self, key: &str) -> Result<BlobInfo> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let (inserted, data) = guard.get(key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        Ok(BlobInfo::new(key, data.len() as u64, *inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read() {
        let backend = MockBackend::default();
        let mut data: &[u8] = b"hello world";
        assert_eq!(backend.create("abc", &mut data).await.unwrap(), 11);
        assert_eq!(backend.read("abc").await.unwrap(), b"hello world");
        assert_eq!(backend.stat("abc").await.unwrap().size, 11);
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let backend = MockBackend::with_blobs([("abc", b"original")]);
        let mut data: &[u8] = b"replacement";
        let err = backend.create("abc", &mut data).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(backend.read("abc").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let backend = MockBackend::default();
        assert!(backend.read("missing").await.unwrap_err().is_not_found());
        assert!(backend.delete("missing").await.unwrap_err().is_not_found());
        assert!(backend.stat("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn reader_streams_contents() {
        let backend = MockBackend::with_blobs([("abc", b"streamed")]);
        let mut reader = backend.reader("abc").await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"streamed");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let backend = MockBackend::with_blobs([("a", "1"), ("b", "22")]);
        let mut listed = backend.list().await.unwrap();
        listed.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(listed.iter().map(|i| i.size).collect::<Vec<_>>(), vec![1, 2]);

        backend.delete("a").await.unwrap();
        assert_eq!(backend.keys().await, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let backend = MockBackend::with_blobs([("a", b"1")]);
        backend.fail_listing(true);
        assert!(backend.list().await.is_err());
        backend.fail_listing(false);
        assert_eq!(backend.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_keys_rejected() {
        let backend = MockBackend::default();
        let err = backend.exists("../escape").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }
}
