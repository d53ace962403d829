//! Storage error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A row holds a value this version does not understand
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
