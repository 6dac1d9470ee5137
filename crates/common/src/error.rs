//! Error types for the merchant transfer client.
//!
//! Library functions return `Result<T, Report<TransferError>>` so callers get
//! the full context chain when a call fails.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Key load error: {message}")]
    KeyLoad { message: String },

    #[error("Signing error: {message}")]
    Signing { message: String },

    #[error("Encryption error: {message}")]
    Encryption { message: String },

    #[error("Decryption error: {message}")]
    Decryption { message: String },

    #[error("Invalid transfer request: {message}")]
    Validation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Unexpected HTTP status: {status}")]
    Status { status: u16 },

    #[error("Not implemented: {operation}")]
    NotImplemented { operation: &'static str },
}

impl TransferError {
    /// Returns the HTTP status code carried by a [`TransferError::Status`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            TransferError::Status { status } => Some(*status),
            _ => None,
        }
    }
}
