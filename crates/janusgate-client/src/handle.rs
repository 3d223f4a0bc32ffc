//! Plugin-binding handle: the per-attachment state machine.
//!
//! A handle represents one plugin session attached to the gateway. Its
//! `message` and `detach` operations follow the two-phase completion
//! pattern: the gateway may answer with a lightweight acknowledgement
//! first and deliver the real result as a later event, in either order.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use janusgate_protocol::{
    ClientRequest, EventMsg, Jsep, PluginData, ServerMessage, TransactionId,
};

use crate::adapter::PluginEvent;
use crate::context::HandleContext;
use crate::error::{ClientError, ClientResult};
use crate::pending::WaiterTable;
use crate::session::SessionInner;

/// Application callback invoked for every decoded plugin event and for
/// protocol-level notifications (`webrtcup`, `dataready`, `hangup`).
///
/// Callbacks run on spawned event tasks; invocation order is not
/// guaranteed to match wire arrival order.
pub type EventCallback = Arc<dyn Fn(PluginEvent) + Send + Sync>;

/// One attached plugin binding.
pub struct Handle {
    id: u64,
    plugin: String,
    tag: RwLock<String>,
    status: RwLock<String>,
    session: Weak<SessionInner>,
    webrtc_up: AtomicBool,
    data_ready: AtomicBool,
    waiters: WaiterTable,
    callback: RwLock<Option<EventCallback>>,
    context: Mutex<HandleContext>,
}

impl Handle {
    pub(crate) fn new(
        id: u64,
        plugin: impl Into<String>,
        tag: impl Into<String>,
        session: Weak<SessionInner>,
    ) -> Self {
        Self {
            id,
            plugin: plugin.into(),
            tag: RwLock::new(tag.into()),
            status: RwLock::new(String::new()),
            session,
            webrtc_up: AtomicBool::new(false),
            data_ready: AtomicBool::new(false),
            waiters: WaiterTable::new(),
            callback: RwLock::new(None),
            context: Mutex::new(HandleContext::new()),
        }
    }

    /// Server-assigned handle id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Plugin identifier this handle is bound to.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Free-form tag, initially the one given at attach time.
    pub async fn tag(&self) -> String {
        self.tag.read().await.clone()
    }

    /// Replaces the tag.
    pub async fn set_tag(&self, tag: impl Into<String>) {
        *self.tag.write().await = tag.into();
    }

    /// Current status label.
    pub async fn status(&self) -> String {
        self.status.read().await.clone()
    }

    /// Replaces the status label.
    pub async fn set_status(&self, status: impl Into<String>) {
        *self.status.write().await = status.into();
    }

    /// True once the gateway reported the PeerConnection up.
    pub fn webrtc_up(&self) -> bool {
        self.webrtc_up.load(Ordering::SeqCst)
    }

    /// True once the gateway reported the data channel writable.
    pub fn data_ready(&self) -> bool {
        self.data_ready.load(Ordering::SeqCst)
    }

    /// Sets the application callback for this handle.
    pub async fn set_callback(&self, callback: EventCallback) {
        *self.callback.write().await = Some(callback);
    }

    /// Returns a snapshot of the context store.
    pub async fn context(&self) -> HandleContext {
        self.context.lock().await.clone()
    }

    /// Sends a plugin message and waits for its result.
    ///
    /// An immediate `success` or deferred result `event` resolves the
    /// call; an immediate acknowledgement makes it wait for the
    /// correlated result event under the configured event timeout.
    pub async fn message(&self, body: Value, jsep: Option<Jsep>) -> ClientResult<PluginReply> {
        let session = self.session()?;
        let txn = TransactionId::generate();
        let mut req =
            ClientRequest::message(session.id(), self.id, body).with_transaction(txn.clone());
        if let Some(jsep) = jsep {
            req = req.with_jsep(jsep);
        }
        let resolved = self.two_phase(req, txn.as_str()).await?;
        reply_from(resolved)
    }

    /// Serializes `body`, sends it and decodes the plugin result into
    /// `R` when the reply's plugin identifier matches this handle's
    /// plugin. A mismatched identifier skips decoding and yields `None`.
    pub async fn send<T, R>(
        &self,
        body: &T,
        jsep: Option<Jsep>,
    ) -> ClientResult<(PluginReply, Option<R>)>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let reply = self.message(serde_json::to_value(body)?, jsep).await?;
        let decoded = reply.decode(&self.plugin)?;
        Ok((reply, decoded))
    }

    /// Detaches this handle from the gateway.
    ///
    /// Follows the same two-phase pattern as [`message`](Self::message).
    /// On success the handle is removed from the session registry and
    /// must not be used again.
    pub async fn detach(&self) -> ClientResult<()> {
        let session = self.session()?;
        let txn = TransactionId::generate();
        let req = ClientRequest::detach(session.id(), self.id).with_transaction(txn.clone());
        match self.two_phase(req, txn.as_str()).await? {
            ServerMessage::Error(m) => Err(ClientError::Server(m.error)),
            _ => {
                session.remove_handle(self.id).await;
                debug!(handle_id = self.id, "handle detached");
                Ok(())
            }
        }
    }

    /// Sends DTMF tones over the binding. Part of the plugin-binding
    /// contract, not provided by this client.
    pub async fn send_dtmf(&self, _tones: &str) -> ClientResult<()> {
        Err(ClientError::NotImplemented("dtmf"))
    }

    /// Hangs up the PeerConnection without detaching. Part of the
    /// plugin-binding contract, not provided by this client.
    pub async fn hangup(&self) -> ClientResult<()> {
        Err(ClientError::NotImplemented("hangup"))
    }

    /// Runs one two-phase exchange: register the secondary waiter,
    /// issue the request, and if the immediate result is an
    /// acknowledgement, wait for the correlated result event.
    ///
    /// The waiter is registered before the request goes out because the
    /// result event may beat the acknowledgement onto the wire.
    async fn two_phase(&self, req: ClientRequest, txn: &str) -> ClientResult<ServerMessage> {
        let session = self.session()?;
        let rx = self.waiters.register(txn).await;

        let first = match session.request(req, session.config().request_timeout).await {
            Ok(msg) => msg,
            Err(e) => {
                self.waiters.discard(txn).await;
                return Err(e);
            }
        };

        match first {
            ServerMessage::Ack(_) => {
                let deadline = session.config().event_timeout;
                match tokio::time::timeout(deadline, rx).await {
                    Ok(Ok(msg)) => Ok(msg),
                    Ok(Err(_)) => Err(ClientError::ConnectionClosed),
                    Err(_) => {
                        self.waiters.discard(txn).await;
                        Err(ClientError::Timeout {
                            operation: "result event",
                            after: deadline,
                        })
                    }
                }
            }
            other => {
                self.waiters.discard(txn).await;
                Ok(other)
            }
        }
    }

    /// Processes one inbound asynchronous event. Invoked on its own
    /// task by the session router.
    pub(crate) async fn dispatch(&self, msg: ServerMessage) {
        // A correlated result event satisfies a blocked message()/detach()
        // caller even when the processing below goes nowhere.
        if let Some(txn) = msg.transaction().map(str::to_owned) {
            self.waiters.resolve(&txn, msg.clone()).await;
        }

        match msg {
            ServerMessage::Event(event) => self.on_plugin_event(event).await,
            ServerMessage::Media(m) => debug!(
                handle_id = self.id,
                kind = ?m.kind,
                receiving = ?m.receiving,
                "media state changed"
            ),
            ServerMessage::SlowLink(m) => debug!(
                handle_id = self.id,
                uplink = ?m.uplink,
                lost = ?m.lost,
                "slow link reported"
            ),
            ServerMessage::Detached(_) => debug!(handle_id = self.id, "detached by gateway"),
            ServerMessage::Hangup(m) => {
                self.webrtc_up.store(false, Ordering::SeqCst);
                self.data_ready.store(false, Ordering::SeqCst);
                debug!(handle_id = self.id, reason = ?m.reason, "peer connection hung up");
                self.emit(PluginEvent::notice("hangup")).await;
            }
            ServerMessage::DataReady(_) => {
                self.data_ready.store(true, Ordering::SeqCst);
                self.peer_ready("dataready").await;
            }
            ServerMessage::WebrtcUp(_) => self.peer_ready("webrtcup").await,
            other => debug!(handle_id = self.id, frame = ?other, "unhandled event verb"),
        }
    }

    /// Shared tail of `dataready` and `webrtcup` handling; only the
    /// exact `webrtcup` verb raises the media-up flag.
    async fn peer_ready(&self, verb: &'static str) {
        if verb == "webrtcup" {
            self.webrtc_up.store(true, Ordering::SeqCst);
        }
        debug!(handle_id = self.id, verb, "peer connection ready");
        self.emit(PluginEvent::notice(verb)).await;
    }

    async fn on_plugin_event(&self, event: EventMsg) {
        let Some(plugindata) = event.plugindata else {
            debug!(handle_id = self.id, "event without plugin payload");
            return;
        };
        if plugindata.plugin != self.plugin {
            debug!(
                handle_id = self.id,
                plugin = %plugindata.plugin,
                "payload for a different plugin skipped"
            );
            return;
        }
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let Some(adapter) = session.adapters().get(&self.plugin).await else {
            debug!(plugin = %self.plugin, "no adapter registered");
            return;
        };

        let decoded = {
            let mut context = self.context.lock().await;
            adapter.decode(&mut context, &plugindata.data, event.jsep.as_ref())
        };
        match decoded {
            Ok(Some(evt)) => self.emit(evt).await,
            Ok(None) => debug!(handle_id = self.id, "adapter produced no event"),
            Err(e) => warn!(handle_id = self.id, error = %e, "adapter failed to decode event"),
        }
    }

    async fn emit(&self, event: PluginEvent) {
        let callback = self.callback.read().await.clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Releases every blocked two-phase caller. Called on session
    /// teardown so in-flight `message`/`detach` calls fail immediately
    /// instead of riding out their event timeout.
    pub(crate) async fn fail_waiters(&self) {
        self.waiters.fail_all().await;
    }

    fn session(&self) -> ClientResult<Arc<SessionInner>> {
        self.session.upgrade().ok_or(ClientError::ConnectionClosed)
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("plugin", &self.plugin)
            .finish()
    }
}

/// The resolved result of a plugin message.
#[derive(Debug, Clone)]
pub struct PluginReply {
    /// Raw plugin payload, if the reply carried one.
    pub plugindata: Option<PluginData>,
    /// SDP negotiation object, if the reply carried one.
    pub jsep: Option<Jsep>,
}

impl PluginReply {
    /// Decodes the payload into `T` when the plugin identifier matches
    /// `plugin`. A mismatch or missing payload yields `Ok(None)`.
    pub fn decode<T: DeserializeOwned>(&self, plugin: &str) -> ClientResult<Option<T>> {
        match &self.plugindata {
            Some(pd) if pd.plugin == plugin => Ok(Some(serde_json::from_value(pd.data.clone())?)),
            _ => Ok(None),
        }
    }

    /// Returns the SDP text when the reply carries an answer.
    pub fn sdp_answer(&self) -> Option<&str> {
        self.jsep
            .as_ref()
            .filter(|j| j.is_answer())
            .map(|j| j.sdp.as_str())
    }
}

/// Maps a resolved two-phase result onto the caller-visible reply,
/// surfacing gateway- and plugin-level errors.
fn reply_from(msg: ServerMessage) -> ClientResult<PluginReply> {
    match msg {
        ServerMessage::Error(m) => Err(ClientError::Server(m.error)),
        ServerMessage::Event(m) => {
            if let Some(pd) = &m.plugindata
                && let Some(err) = plugin_error(&pd.data)
            {
                return Err(err);
            }
            Ok(PluginReply {
                plugindata: m.plugindata,
                jsep: m.jsep,
            })
        }
        ServerMessage::Success(m) => {
            if let Some(pd) = &m.plugindata
                && let Some(err) = plugin_error(&pd.data)
            {
                return Err(err);
            }
            Ok(PluginReply {
                plugindata: m.plugindata,
                jsep: m.jsep,
            })
        }
        other => Err(ClientError::UnexpectedReply { verb: other.verb() }),
    }
}

/// Detects a plugin-embedded error inside an otherwise successful
/// payload (`error` reason, optional `error_code`).
fn plugin_error(data: &Value) -> Option<ClientError> {
    let reason = data.get("error")?.as_str()?.to_string();
    let code = data.get("error_code").and_then(Value::as_i64).unwrap_or(0);
    Some(ClientError::Plugin { code, reason })
}
