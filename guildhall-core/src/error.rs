//! Error types for the guildhall core library.
//!
//! Only unexpected failures live here. Expected rejections (full inventory,
//! wrong delivery item, non-destroyable removal) are typed outcomes returned
//! by the component that validates them.

use thiserror::Error;

/// Top-level error type for guildhall operations.
#[derive(Error, Debug)]
pub enum QuestError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// `SQLite` persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, QuestError>;
