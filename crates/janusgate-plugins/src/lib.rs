//! Reference plugin adapters for the gateway client.
//!
//! Each module covers one gateway plugin: typed request payloads, a
//! typed response and a [`PluginAdapter`](janusgate_client::PluginAdapter)
//! implementation that turns raw event payloads into named, typed
//! events and keeps plugin-assigned state in the handle context.

pub mod sip;
pub mod videoroom;

pub use sip::SipAdapter;
pub use videoroom::VideoRoomAdapter;
