//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
const MAX_CONNECTIONS: u32 = 5;
/// Side files SQLite keeps next to the database in WAL mode.
const SIDE_FILE_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Database connection pool for the metadata store.
///
/// Every repository operation checks a connection out of this pool and
/// returns it on every exit path, so the pool is the only thing that needs
/// sharing between request handlers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    /// `None` for in-memory databases.
    path: Option<PathBuf>,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>, path: Option<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to every connection in the pool,
            // not only the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, path };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the metadata database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None, Some(path.to_path_buf())).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// In-memory databases are destroyed when the connection closes. Not
    /// gated behind `#[cfg(test)]` so other crates can use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Parallel connections to `:memory:` would each see their own empty
        // database, so stick to one.
        Self::new(options, Some(1), None).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Concurrent writers (download counters, mostly) queue up on the
            // SQLite lock instead of failing with SQLITE_BUSY.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// This is called automatically by `connect` and `connect_in_memory`.
    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path of the database file, if it lives on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bytes used on disk by the database file and its WAL/SHM side files.
    ///
    /// Files that don't exist (yet) count as zero; in-memory databases are
    /// always zero.
    pub async fn size_on_disk(&self) -> u64 {
        let Some(path) = &self.path else {
            return 0;
        };
        let mut candidates = vec![path.clone()];
        for suffix in SIDE_FILE_SUFFIXES {
            let mut side = path.clone().into_os_string();
            side.push(suffix);
            candidates.push(PathBuf::from(side));
        }
        let mut total = 0;
        for candidate in candidates {
            if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
                total += metadata.len();
            }
        }
        total
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned to the pool and then closes
    /// them. The Database instance should not be used afterwards.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
