//! Wire model for the Janus gateway WebSocket API.
//!
//! This crate defines the JSON frames exchanged with a Janus media gateway
//! over a WebSocket negotiated with the `janus-protocol` sub-protocol.
//!
//! # Frame shapes
//!
//! Requests are flat JSON objects discriminated by the `janus` verb:
//!
//! ```json
//! {"janus": "attach", "transaction": "h3k9mwp2ab", "session_id": 1, "plugin": "..."}
//! ```
//!
//! Responses and asynchronous events use the same discriminant and are
//! decoded into the closed [`ServerMessage`] enum; verbs this crate does
//! not know about land in [`ServerMessage::Unrecognized`] instead of
//! failing deserialization.
//!
//! # Example
//!
//! ```rust
//! use janusgate_protocol::{ClientRequest, TransactionId};
//!
//! let txn = TransactionId::generate();
//! let request = ClientRequest::create().with_transaction(txn.clone());
//! let json = serde_json::to_string(&request).unwrap();
//! assert!(json.contains(txn.as_str()));
//! ```

mod error;
mod framing;
mod txid;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_frame, encode_frame};
pub use txid::{TRANSACTION_ALPHABET, TRANSACTION_LEN, TransactionId};
pub use types::{
    AckMsg, ApiError, ClientRequest, ErrorMsg, EventMsg, HandleNotice, HangupMsg, Jsep, MediaMsg,
    PluginData, RequestVerb, ServerMessage, SlowLinkMsg, SuccessData, SuccessMsg,
};

/// WebSocket sub-protocol the gateway expects during the handshake.
pub const SUB_PROTOCOL: &str = "janus-protocol";
