//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize or deserialize a JSON frame.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A transaction id did not have the expected shape.
    #[error("invalid transaction id {0:?}: expected {expected} characters from the fixed alphabet", expected = crate::TRANSACTION_LEN)]
    InvalidTransactionId(String),
}
