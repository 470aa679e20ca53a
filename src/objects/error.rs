//! Object and storage error types.

use std::path::PathBuf;

use thiserror::Error;

use super::id::ObjectId;

/// Errors raised by an object's embedded store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage directory could not be created.
    #[error("Failed to prepare storage directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database could not be opened.
    #[error("Failed to open embedded store: {0}")]
    Open(#[source] sqlx::Error),

    /// The query could not be executed.
    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// A single-row query returned zero or several rows.
    #[error("Expected exactly one row, found {found}")]
    RowCount { found: usize },

    /// The requested column is missing or not text.
    #[error("Column `{column}` unavailable: {source}")]
    Column {
        column: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Errors raised when invoking an object through its stub.
#[derive(Error, Debug)]
pub enum ObjectError {
    /// The object's mailbox is closed (namespace shut down or actor gone).
    #[error("Object {id} is unavailable")]
    Unavailable { id: ObjectId },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
