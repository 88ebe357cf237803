//! Repository for file records.

use crate::Database;
use crate::error::{ErrorKind, Result, is_unique_violation};
use crate::models::{FileRecord, FileRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

/// Repository for managing file records in the metadata database.
///
/// Each method is a single statement, and therefore its own transaction. No
/// method holds a connection past its return.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a new record.
    ///
    /// Returns [`ErrorKind::DuplicateKey`] if a record with the same id is
    /// already present; the existing record is left as it was.
    pub async fn insert(&self, record: &FileRecord) -> Result<()> {
        let row = FileRow::try_from(record)?;
        let result = sqlx::query(include_str!("../queries/insert_file.sql"))
            .bind(&row.id)
            .bind(row.name)
            .bind(row.upload_date)
            .bind(row.size)
            .bind(row.size_bytes)
            .bind(row.downloads)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => exn::bail!(ErrorKind::DuplicateKey(row.id)),
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get a record by id.
    pub async fn get(&self, id: &str) -> Result<FileRecord> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/get_file.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::NotFound(id.to_string())),
        }
    }

    /// All records, newest upload first.
    ///
    /// Records uploaded within the same second come out newest insert first.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/list_files.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Every id in the table.
    pub async fn ids(&self) -> Result<BTreeSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar(include_str!("../queries/file_ids.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ids.into_iter().collect())
    }

    /// Number of records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_files.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("record count"))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Change the display name of a record.
    pub async fn update_name(&self, id: &str, name: &str) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/update_name.sql"))
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::expect_one(result.rows_affected(), id)
    }

    /// Add one to the download counter.
    ///
    /// A single `UPDATE ... SET downloads = downloads + 1`, so concurrent
    /// callers never lose increments.
    pub async fn increment_downloads(&self, id: &str) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/increment_downloads.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::expect_one(result.rows_affected(), id)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a record.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/delete_file.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::expect_one(result.rows_affected(), id)
    }

    fn expect_one(rows_affected: u64, id: &str) -> Result<()> {
        match rows_affected {
            0 => exn::bail!(ErrorKind::NotFound(id.to_string())),
            _ => Ok(()),
        }
    }
}
