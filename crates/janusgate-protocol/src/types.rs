//! Request and response frame types for the Janus gateway protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::txid::TransactionId;

/// Request verbs the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestVerb {
    /// Create a new session.
    Create,
    /// Attach a plugin binding to a session.
    Attach,
    /// Detach a plugin binding.
    Detach,
    /// Send a plugin message.
    Message,
    /// Keep the session alive.
    Keepalive,
}

/// An outbound request frame.
///
/// All side fields are optional on the wire; absent fields are omitted
/// entirely rather than serialized with a default value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRequest {
    /// The request verb.
    pub janus: RequestVerb,

    /// Correlation id; assigned before sending if the caller left it out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    /// Shared API secret, when the gateway requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apisecret: Option<String>,

    /// Target session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,

    /// Target handle id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_id: Option<u64>,

    /// Plugin identifier (attach only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,

    /// Plugin-specific request body (message only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// SDP negotiation object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsep: Option<Jsep>,
}

impl ClientRequest {
    fn new(janus: RequestVerb) -> Self {
        Self {
            janus,
            transaction: None,
            apisecret: None,
            session_id: None,
            handle_id: None,
            plugin: None,
            body: None,
            jsep: None,
        }
    }

    /// Creates a session-create request.
    pub fn create() -> Self {
        Self::new(RequestVerb::Create)
    }

    /// Creates an attach request for the given plugin.
    pub fn attach(session_id: u64, plugin: impl Into<String>) -> Self {
        let mut req = Self::new(RequestVerb::Attach);
        req.session_id = Some(session_id);
        req.plugin = Some(plugin.into());
        req
    }

    /// Creates a detach request for the given handle.
    pub fn detach(session_id: u64, handle_id: u64) -> Self {
        let mut req = Self::new(RequestVerb::Detach);
        req.session_id = Some(session_id);
        req.handle_id = Some(handle_id);
        req
    }

    /// Creates a plugin message request.
    pub fn message(session_id: u64, handle_id: u64, body: Value) -> Self {
        let mut req = Self::new(RequestVerb::Message);
        req.session_id = Some(session_id);
        req.handle_id = Some(handle_id);
        req.body = Some(body);
        req
    }

    /// Creates a keepalive request.
    pub fn keepalive(session_id: u64) -> Self {
        let mut req = Self::new(RequestVerb::Keepalive);
        req.session_id = Some(session_id);
        req
    }

    /// Builder: set the transaction id.
    pub fn with_transaction(mut self, txn: TransactionId) -> Self {
        self.transaction = Some(txn.into_string());
        self
    }

    /// Builder: set the API secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.apisecret = Some(secret.into());
        self
    }

    /// Builder: attach an SDP negotiation object.
    pub fn with_jsep(mut self, jsep: Jsep) -> Self {
        self.jsep = Some(jsep);
        self
    }
}

/// SDP negotiation object exchanged with the gateway.
///
/// The optional booleans are tri-state on the wire: absent, `false` and
/// `true` are all distinct and must stay that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jsep {
    /// `"offer"` or `"answer"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// SDP text.
    pub sdp: String,

    /// Whether trickle ICE is in use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trickle: Option<bool>,

    /// Whether this is a renegotiation of an existing PeerConnection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
}

impl Jsep {
    /// Creates an SDP offer.
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "offer".to_string(),
            sdp: sdp.into(),
            trickle: None,
            update: None,
        }
    }

    /// Creates an SDP answer.
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "answer".to_string(),
            sdp: sdp.into(),
            trickle: None,
            update: None,
        }
    }

    /// Builder: set the trickle flag.
    pub fn with_trickle(mut self, trickle: bool) -> Self {
        self.trickle = Some(trickle);
        self
    }

    /// Returns true if this is an offer.
    pub fn is_offer(&self) -> bool {
        self.kind == "offer"
    }

    /// Returns true if this is an answer.
    pub fn is_answer(&self) -> bool {
        self.kind == "answer"
    }
}

/// Raw, undecoded plugin payload attached to a response or event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginData {
    /// Plugin identifier, e.g. `janus.plugin.videoroom`.
    pub plugin: String,
    /// Plugin payload, left undecoded until an adapter claims it.
    pub data: Value,
}

/// Top-level error carried by an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable reason.
    pub reason: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason, self.code)
    }
}

/// Payload of a `success` frame: the server-assigned id for the object
/// just created (session or handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessData {
    /// Server-assigned numeric id.
    pub id: u64,
}

/// A `success` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMsg {
    /// Correlation id of the request this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle that produced the frame, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    /// Created-object id for create/attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SuccessData>,
    /// Immediate plugin result, when a message completed synchronously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugindata: Option<PluginData>,
    /// SDP negotiation object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsep: Option<Jsep>,
}

/// An `ack` frame: the request was received, its result arrives later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMsg {
    /// Correlation id of the acknowledged request.
    pub transaction: String,
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
}

/// An `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    /// Correlation id of the failed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Error details.
    pub error: ApiError,
}

/// An asynchronous `event` frame carrying a plugin payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMsg {
    /// Correlation id, present when this is the deferred result of a
    /// two-phase request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle the event targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    /// Plugin payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugindata: Option<PluginData>,
    /// SDP negotiation object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsep: Option<Jsep>,
}

/// A notification without a payload beyond its target handle
/// (`webrtcup`, `detached`, `dataready`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleNotice {
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle the event targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
}

/// A `media` frame: the gateway started or stopped receiving a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMsg {
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle the event targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    /// Media kind, `"audio"` or `"video"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Whether the gateway is receiving the stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<bool>,
}

/// A `slowlink` frame: too many NACKs on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowLinkMsg {
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle the event targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    /// True when the problem is on the uplink (client to gateway).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink: Option<bool>,
    /// Number of packets lost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lost: Option<u64>,
}

/// A `hangup` frame: the PeerConnection was torn down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HangupMsg {
    /// Session the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Handle the event targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    /// Why the PeerConnection was closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An inbound frame, discriminated by the `janus` verb.
///
/// Decoding is exhaustive over the verbs the protocol defines; anything
/// else maps to [`ServerMessage::Unrecognized`] so an unexpected frame
/// can never fail envelope decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "janus", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Request received; the real result arrives as a later event.
    Ack(AckMsg),
    /// Request completed with a direct result.
    Success(SuccessMsg),
    /// Request failed at the gateway level.
    Error(ErrorMsg),
    /// Asynchronous plugin event.
    Event(EventMsg),
    /// The PeerConnection for a handle is up.
    WebrtcUp(HandleNotice),
    /// Media receive state changed for a handle.
    Media(MediaMsg),
    /// Link quality report.
    SlowLink(SlowLinkMsg),
    /// PeerConnection closed.
    Hangup(HangupMsg),
    /// Handle was detached gateway-side.
    Detached(HandleNotice),
    /// The data channel for a handle is writable.
    DataReady(HandleNotice),
    /// Any verb this crate does not know.
    #[serde(other)]
    Unrecognized,
}

impl ServerMessage {
    /// Returns the verb string of this frame.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Ack(_) => "ack",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
            Self::Event(_) => "event",
            Self::WebrtcUp(_) => "webrtcup",
            Self::Media(_) => "media",
            Self::SlowLink(_) => "slowlink",
            Self::Hangup(_) => "hangup",
            Self::Detached(_) => "detached",
            Self::DataReady(_) => "dataready",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Returns the correlation id, when the frame carries one.
    pub fn transaction(&self) -> Option<&str> {
        match self {
            Self::Ack(m) => Some(&m.transaction),
            Self::Success(m) => m.transaction.as_deref(),
            Self::Error(m) => m.transaction.as_deref(),
            Self::Event(m) => m.transaction.as_deref(),
            _ => None,
        }
    }

    /// Returns the sender handle id, when the frame carries one.
    pub fn sender(&self) -> Option<u64> {
        match self {
            Self::Success(m) => m.sender,
            Self::Event(m) => m.sender,
            Self::WebrtcUp(m) | Self::Detached(m) | Self::DataReady(m) => m.sender,
            Self::Media(m) => m.sender,
            Self::SlowLink(m) => m.sender,
            Self::Hangup(m) => m.sender,
            _ => None,
        }
    }

    /// Returns the session id, when the frame carries one.
    pub fn session_id(&self) -> Option<u64> {
        match self {
            Self::Ack(m) => m.session_id,
            Self::Success(m) => m.session_id,
            Self::Error(m) => m.session_id,
            Self::Event(m) => m.session_id,
            Self::WebrtcUp(m) | Self::Detached(m) | Self::DataReady(m) => m.session_id,
            Self::Media(m) => m.session_id,
            Self::SlowLink(m) => m.session_id,
            Self::Hangup(m) => m.session_id,
            Self::Unrecognized => None,
        }
    }

    /// Returns true for verbs that are routed to a handle rather than
    /// resolved against the pending-transaction table.
    pub fn is_async_event(&self) -> bool {
        matches!(
            self,
            Self::Event(_)
                | Self::WebrtcUp(_)
                | Self::Media(_)
                | Self::SlowLink(_)
                | Self::Hangup(_)
                | Self::Detached(_)
                | Self::DataReady(_)
        )
    }
}
