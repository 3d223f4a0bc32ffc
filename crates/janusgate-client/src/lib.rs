//! Protocol engine for the Janus gateway WebSocket API.
//!
//! This crate multiplexes many concurrent logical requests and
//! server-pushed notifications over one physical WebSocket connection:
//!
//! - [`Session`] owns the connection: a single read loop, a
//!   write-exclusive sink, a periodic keepalive task and the registries
//!   of attached handles and pending transactions.
//! - Each request registers a pending waiter keyed by its transaction id;
//!   the read loop resolves exactly one waiter per correlated response.
//! - Asynchronous event frames (`event`, `webrtcup`, `media`, ...) are
//!   routed to the owning [`Handle`] and processed concurrently, with no
//!   ordering guarantee relative to wire arrival.
//! - [`Handle::message`] and [`Handle::detach`] implement the two-phase
//!   completion pattern: an immediate acknowledgement followed by an
//!   out-of-band result event, with no guaranteed ordering between the
//!   two.
//!
//! # Example
//!
//! ```rust,no_run
//! use janusgate_client::{ClientConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("ws://127.0.0.1:8188").with_secret("janusrocks");
//!     let session = Session::connect(config).await?;
//!
//!     let handle = session.attach("janus.plugin.videoroom", "control").await?;
//!     let reply = handle
//!         .message(serde_json::json!({"request": "listparticipants", "room": 1234}), None)
//!         .await?;
//!     println!("reply: {:?}", reply.plugindata);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

mod adapter;
mod config;
mod context;
mod error;
mod handle;
mod pending;
mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use adapter::{AdapterError, AdapterRegistry, AdapterResult, PluginAdapter, PluginEvent};
pub use config::ClientConfig;
pub use context::HandleContext;
pub use error::{ClientError, ClientResult};
pub use handle::{EventCallback, Handle, PluginReply};
pub use session::Session;

// Re-export the wire model so applications need only this crate.
pub use janusgate_protocol as protocol;
pub use janusgate_protocol::{Jsep, PluginData};
