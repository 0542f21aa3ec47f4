//! Error types for lyrisync-overlay
//!
//! Provider failures never appear here: the resolution pipeline turns them
//! into explicit outcomes before they reach a caller.

use thiserror::Error;

/// Main error type for lyrisync-overlay
#[derive(Error, Debug)]
pub enum Error {
    /// lyrisync-common error
    #[error("Common error: {0}")]
    Common(#[from] lyrisync_common::Error),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data-model invariant violated (e.g. an empty line index)
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Convenience Result type using lyrisync-overlay Error
pub type Result<T> = std::result::Result<T, Error>;
