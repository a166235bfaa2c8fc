//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading or writing configuration files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A stopover code was not exactly three alphabetic characters.
    #[error("Invalid stopover code: {0:?}")]
    InvalidCode(String),

    /// The document could not be opened or read at all.
    ///
    /// Fatal to an entire scan, unlike a single unreadable page which is
    /// skipped.
    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
