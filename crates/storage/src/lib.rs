//! Blob storage for uploaded files.
//!
//! The blob store is deliberately dumb: a single flat namespace of opaque
//! files, each named by its identifier. No extensions, no subdirectories, no
//! knowledge of display names or sizes beyond what the filesystem reports.
//! Everything descriptive lives in the metadata store.

pub mod backend;
pub mod error;
mod key;
mod models;

pub use crate::backend::StorageBackend;
pub use crate::key::validate as validate_key;
pub use crate::models::BlobInfo;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
