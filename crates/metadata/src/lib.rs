//! SQLite metadata store for uploaded files.
//!
//! One table, `files`, maps each blob identifier to the details shown to the
//! operator: display name, upload date, formatted size, and how often the
//! file has been downloaded. The blob store knows nothing of these; keeping
//! both sides in agreement is the library's reconciler's job.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::FileRecord;
pub use crate::repo::Repository;
