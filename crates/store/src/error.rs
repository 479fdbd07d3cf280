use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another unit of work held the row lock for longer than the wait bound.
    /// Callers should retry.
    #[error("Lock on {resource} not acquired within {waited:?}: resource is in use, retry")]
    LockTimeout { resource: String, waited: Duration },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted value could not be mapped back onto an entity.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A thread panicked while holding the in-memory lock table.
    #[error("Lock table poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns true for contention failures that are worth retrying.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
