//! Error types for Havoc.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HavocError>;

#[derive(Error, Debug)]
pub enum HavocError {
    /// I/O errors from scratch-file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request body that could not be decoded into a configuration
    #[error("malformed request body: {0}")]
    BadRequest(#[from] serde_json::Error),

    /// The deadlock injector refuses to create more pairs
    #[error("deadlock pair limit reached ({created} already created)")]
    DeadlockLimit { created: u32 },

    /// Unexpected error
    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl HavocError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected { message: message.into() }
    }
}
