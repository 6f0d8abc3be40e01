//! Error types for user data operations.

use breezy_core::{AppError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt};
use thiserror::Error;

/// Errors from the document store, local storage and phone verification.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document store rejected the request.
    #[error("Document store error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Local storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid document: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Result type for user data operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Remote { status, message } => {
                Self::Network(NetworkError::ServerError { status, message })
            }
            StoreError::Validation(msg) => Self::Service(msg),
            StoreError::Network(e) => Self::Network(e.into_network_error()),
            StoreError::Database(e) => Self::Database(e.into_database_error()),
            StoreError::Decode(msg) => Self::Database(DatabaseError::Corruption(msg)),
            StoreError::Io(e) => Self::Io(e),
        }
    }
}
