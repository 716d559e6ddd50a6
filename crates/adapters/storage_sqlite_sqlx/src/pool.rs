//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StorageError;

/// How long a connection waits on a locked database before failing a save.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the `SQLite` storage adapter.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:fluxhub.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Whether the URL names a private in-memory database.
    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Open the database backing the device state store.
    ///
    /// Creates the database file if missing and runs the pending migrations,
    /// so the `device_states` table exists before any device actor saves.
    /// File databases use WAL journaling with a busy timeout, since every
    /// device actor writes through the same pool. An in-memory database only
    /// lives as long as its connection, so it is served by a single
    /// connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is malformed, the connection
    /// cannot be opened, or a migration fails.
    pub async fn build(self) -> Result<Database, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        Database::initialize(pool).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Run migrations on a freshly opened pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a migration fails.
    async fn initialize(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
