//! Plugin adapter contract and registry.
//!
//! The core never interprets plugin payloads itself. An adapter is
//! registered per plugin identifier at startup and turns a raw payload
//! into a named, typed event; new plugins need no core change.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use janusgate_protocol::Jsep;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::context::HandleContext;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors an adapter can report while decoding a payload.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The payload did not match the plugin's schema.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload was structurally valid but semantically wrong.
    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// A decoded plugin event delivered to the application callback.
///
/// The body is type-erased so the core stays plugin-agnostic; consumers
/// downcast it back to the adapter's concrete type.
pub struct PluginEvent {
    name: String,
    body: Option<Box<dyn Any + Send + Sync>>,
    jsep: Option<Jsep>,
}

impl PluginEvent {
    /// Creates an event with a typed body.
    pub fn new(name: impl Into<String>, body: impl Any + Send + Sync) -> Self {
        Self {
            name: name.into(),
            body: Some(Box::new(body)),
            jsep: None,
        }
    }

    /// Creates an event with an empty payload (protocol-level
    /// notifications such as `webrtcup`).
    pub fn notice(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: None,
            jsep: None,
        }
    }

    /// Builder: attach the SDP negotiation object that accompanied the
    /// event.
    pub fn with_jsep(mut self, jsep: Option<Jsep>) -> Self {
        self.jsep = jsep;
        self
    }

    /// Event name, e.g. `joined` or `webrtcup`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accompanying SDP negotiation object, if any.
    pub fn jsep(&self) -> Option<&Jsep> {
        self.jsep.as_ref()
    }

    /// Returns the typed body, if it is a `T`.
    pub fn body<T: Any>(&self) -> Option<&T> {
        self.body.as_deref().and_then(|b| b.downcast_ref())
    }

    /// Returns true if the event carries no payload.
    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for PluginEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEvent")
            .field("name", &self.name)
            .field("has_body", &self.body.is_some())
            .field("jsep", &self.jsep)
            .finish()
    }
}

/// Decodes raw plugin payloads into typed events.
///
/// Implementations may write plugin-assigned state into the handle
/// context (e.g. a participant id) while decoding.
pub trait PluginAdapter: Send + Sync {
    /// Plugin identifier this adapter claims, e.g.
    /// `janus.plugin.videoroom`.
    fn plugin(&self) -> &str;

    /// Decodes a raw payload into a named event.
    ///
    /// Returns `Ok(None)` when the payload is not applicable (the
    /// adapter recognizes the plugin but the payload carries nothing to
    /// deliver).
    fn decode(
        &self,
        context: &mut HandleContext,
        data: &Value,
        jsep: Option<&Jsep>,
    ) -> AdapterResult<Option<PluginEvent>>;
}

/// Identifier-keyed adapter registry, populated at startup.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn PluginAdapter>>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its plugin identifier, replacing any
    /// previous adapter for the same plugin.
    pub async fn register(&self, adapter: Arc<dyn PluginAdapter>) {
        self.adapters
            .write()
            .await
            .insert(adapter.plugin().to_string(), adapter);
    }

    /// Looks up the adapter for a plugin identifier (exact match).
    pub async fn get(&self, plugin: &str) -> Option<Arc<dyn PluginAdapter>> {
        self.adapters.read().await.get(plugin).cloned()
    }
}
