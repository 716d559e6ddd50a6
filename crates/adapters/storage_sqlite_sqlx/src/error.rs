//! Storage-specific error type wrapping sqlx errors.

use fluxhub_domain::error::FluxHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed, or a stored row could not be decoded.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for FluxHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
