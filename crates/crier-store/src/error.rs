use thiserror::Error;

/// Errors that can occur within the queue store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The item being created or updated violates a schema invariant.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No item with the given uuid exists in the store.
    #[error("Item not found: {uuid}")]
    NotFound { uuid: String },

    /// The store file exists but cannot be read as a queue database.
    /// Fatal at startup: the daemon refuses to run on a partial store.
    #[error("Store corrupt or unreadable: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
