//! Client error types.

use std::time::Duration;

use janusgate_protocol::{ApiError, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to callers of the protocol engine.
///
/// Malformed inbound frames are deliberately absent: the read loop logs
/// and drops them without involving any caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport setup or maintenance failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The session was torn down while the operation was in flight.
    #[error("connection closed")]
    ConnectionClosed,

    /// No correlated response arrived within the deadline.
    #[error("timed out after {after:?} waiting for {operation}")]
    Timeout {
        /// What the caller was waiting for.
        operation: &'static str,
        /// The deadline that expired.
        after: Duration,
    },

    /// The gateway answered with a top-level `error` frame.
    #[error("gateway error: {0}")]
    Server(ApiError),

    /// A plugin embedded an error inside an otherwise successful event.
    #[error("plugin error {code}: {reason}")]
    Plugin {
        /// Plugin-specific error code.
        code: i64,
        /// Human-readable reason.
        reason: String,
    },

    /// Encoding a request or decoding a caller-requested payload failed.
    #[error("decode failed: {0}")]
    Decode(#[from] ProtocolError),

    /// The gateway answered a request with a verb that makes no sense
    /// for it.
    #[error("unexpected {verb} reply")]
    UnexpectedReply {
        /// Verb of the offending frame.
        verb: &'static str,
    },

    /// Operation defined by the protocol contract but not provided by
    /// this client.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.into())
    }
}
