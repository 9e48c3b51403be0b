//! `SQLite` access shared by the task tracker and the track store.
//!
//! Opening a [`Database`] creates the file when missing, switches it to WAL
//! journaling, applies the busy timeout and runs the embedded migrations.
//!
//! ```no_run
//! use std::path::Path;
//! use track_downloader::{Database, SqliteTaskTracker};
//!
//! # async fn open() -> Result<(), track_downloader::DbError> {
//! let db = Database::new(Path::new("tasks.db")).await?;
//! let _tracker = SqliteTaskTracker::new(db.clone());
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size for file databases. `SQLite` serializes writers anyway.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on the file lock before failing, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Errors from opening or querying the database.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot open task database: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("task database schema upgrade failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning for file-backed databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// `PRAGMA busy_timeout` value in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Cloneable handle to a migrated `SQLite` pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens `db_path` with [`DatabaseOptions::default`].
    ///
    /// # Errors
    ///
    /// See [`Database::new_with_options`].
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        Self::new_with_options(db_path, DatabaseOptions::default()).await
    }

    /// Opens (or creates) `db_path` and brings its schema up to date.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] when the file cannot be opened or configured,
    /// [`DbError::Migration`] when the schema cannot be applied.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new_with_options(
        db_path: &Path,
        options: DatabaseOptions,
    ) -> Result<Self, DbError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(u64::from(options.busy_timeout_ms)));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await?;
        Self::migrate(pool).await
    }

    /// Private in-memory database on a single connection, so every query
    /// sees the same data.
    ///
    /// # Errors
    ///
    /// Same as [`Database::new_with_options`].
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("task database schema up to date");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the pragma query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Waits for checked-out connections and closes the pool.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}
