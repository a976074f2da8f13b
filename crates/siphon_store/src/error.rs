//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named table does not exist.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// A table with this name already exists.
    #[error("table already exists: {0}")]
    DuplicateTable(String),

    /// A schema or index blob could not be interpreted.
    #[error("invalid schema blob: {0}")]
    Schema(String),

    /// Underlying I/O failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
