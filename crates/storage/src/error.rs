use thiserror::Error;

/// A dynamic error type for encapsulating low-level database/backend errors.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that may occur while interacting with the message store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to initialize the underlying database environment or schema.
    #[error("database initialization failed")]
    DatabaseInit(#[source] SourceError),

    /// A database read, write, or commit failed.
    #[error("database operation failed")]
    Database(#[from] reth_db::DatabaseError),

    /// A stored value failed to decode.
    #[error("failed to decode stored value")]
    Decode(#[source] alloy_rlp::Error),

    /// The expected entry was not found in the database.
    #[error("entry not found: {0}")]
    EntryNotFound(String),
}
