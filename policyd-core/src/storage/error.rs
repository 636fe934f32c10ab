//! Policy store error types

use thiserror::Error;

/// Errors for policy store operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Unknown administrator: {0}")]
    UnknownAdmin(String),

    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Administrator '{0}' cannot be disenrolled")]
    ProtectedAdmin(String),

    #[error("Stored value for '{policy}' is corrupt: {value}")]
    Corrupt { policy: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
