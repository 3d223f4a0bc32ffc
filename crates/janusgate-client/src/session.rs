//! Gateway session: connection lifecycle, frame routing and keepalive.
//!
//! A [`Session`] owns one WebSocket connection to the gateway. A single
//! read loop classifies every inbound frame: asynchronous events are
//! routed to their target handle on a spawned task, direct responses
//! resolve the pending-transaction table, and anything else is logged
//! and dropped. The loop survives every anomaly except transport
//! failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use janusgate_protocol::{
    ClientRequest, SUB_PROTOCOL, ServerMessage, TransactionId, decode_frame, encode_frame,
};

use crate::adapter::{AdapterRegistry, PluginAdapter};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::handle::Handle;
use crate::pending::WaiterTable;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// A live control session with the gateway.
///
/// Cloning is cheap; all clones share the same connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    id: AtomicU64,
    config: ClientConfig,
    writer: Mutex<WsSink>,
    pending: WaiterTable,
    handles: RwLock<HashMap<u64, Arc<Handle>>>,
    adapters: AdapterRegistry,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Session {
    /// Connects to the gateway and creates a session.
    ///
    /// Establishes the WebSocket (with the `janus-protocol`
    /// sub-protocol), starts the read loop, performs the `create`
    /// exchange and starts the keepalive task.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let url = Url::parse(&config.server_url)
            .map_err(|e| ClientError::Connection(format!("invalid gateway address: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ClientError::Connection(format!(
                "unsupported scheme {:?}, expected ws or wss",
                url.scheme()
            )));
        }

        let mut request = config.server_url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUB_PROTOCOL));
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        debug!(url = %config.server_url, "transport connected");
        let (sink, source) = stream.split();

        let (shutdown, _) = watch::channel(false);
        let inner = Arc::new(SessionInner {
            id: AtomicU64::new(0),
            config,
            writer: Mutex::new(sink),
            pending: WaiterTable::new(),
            handles: RwLock::new(HashMap::new()),
            adapters: AdapterRegistry::new(),
            closed: AtomicBool::new(false),
            shutdown,
        });
        tokio::spawn(read_loop(inner.clone(), source));

        let timeout = inner.config.request_timeout;
        let id = match inner.request(ClientRequest::create(), timeout).await {
            Ok(ServerMessage::Success(m)) => match m.data {
                Some(data) => data.id,
                None => {
                    inner.teardown("create returned no id").await;
                    return Err(ClientError::UnexpectedReply { verb: "success" });
                }
            },
            Ok(ServerMessage::Error(m)) => {
                inner.teardown("create rejected").await;
                return Err(ClientError::Server(m.error));
            }
            Ok(other) => {
                inner.teardown("create answered with unexpected verb").await;
                return Err(ClientError::UnexpectedReply { verb: other.verb() });
            }
            Err(e) => {
                inner.teardown("create failed").await;
                return Err(e);
            }
        };
        inner.id.store(id, Ordering::SeqCst);
        info!(session_id = id, "session created");

        tokio::spawn(keepalive_loop(inner.clone()));
        Ok(Self { inner })
    }

    /// Server-assigned session id.
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// Returns true once the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Registers a plugin adapter for event decoding.
    pub async fn register_adapter(&self, adapter: Arc<dyn PluginAdapter>) {
        self.inner.adapters.register(adapter).await;
    }

    /// Attaches a plugin binding, returning the new handle.
    ///
    /// `tag` is a free-form label carried on the handle for the
    /// application's own bookkeeping.
    pub async fn attach(&self, plugin: &str, tag: &str) -> ClientResult<Arc<Handle>> {
        let req = ClientRequest::attach(self.inner.id(), plugin);
        match self
            .inner
            .request(req, self.inner.config.request_timeout)
            .await?
        {
            ServerMessage::Success(m) => {
                let id = m
                    .data
                    .ok_or(ClientError::UnexpectedReply { verb: "success" })?
                    .id;
                let handle = Arc::new(Handle::new(id, plugin, tag, Arc::downgrade(&self.inner)));
                self.inner.handles.write().await.insert(id, handle.clone());
                info!(handle_id = id, plugin, "plugin attached");
                Ok(handle)
            }
            ServerMessage::Error(m) => Err(ClientError::Server(m.error)),
            other => Err(ClientError::UnexpectedReply { verb: other.verb() }),
        }
    }

    /// Closes the connection and releases every blocked caller.
    ///
    /// Best effort on the wire; teardown proceeds even when the close
    /// frame cannot be sent. Idempotent.
    pub async fn close(&self) {
        self.inner.teardown("closed by client").await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SessionInner {
    pub(crate) fn id(&self) -> u64 {
        self.id.load(Ordering::SeqCst)
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub(crate) async fn remove_handle(&self, id: u64) {
        self.handles.write().await.remove(&id);
    }

    /// Sends a request and waits for its direct response.
    ///
    /// Fills in the transaction id and API secret when absent. The
    /// waiter is discarded on timeout so a late response becomes a
    /// routine unknown-transaction miss rather than a leak.
    pub(crate) async fn request(
        &self,
        mut req: ClientRequest,
        timeout: Duration,
    ) -> ClientResult<ServerMessage> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectionClosed);
        }
        if req.apisecret.is_none()
            && let Some(secret) = &self.config.api_secret
        {
            req.apisecret = Some(secret.clone());
        }
        let txn = match req.transaction.clone() {
            Some(txn) => txn,
            None => {
                let txn = TransactionId::generate().into_string();
                req.transaction = Some(txn.clone());
                txn
            }
        };

        let rx = self.pending.register(&txn).await;
        if let Err(e) = self.send(&req).await {
            self.pending.discard(&txn).await;
            return Err(e);
        }
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                self.pending.discard(&txn).await;
                Err(ClientError::Timeout {
                    operation: "direct response",
                    after: timeout,
                })
            }
        }
    }

    async fn send(&self, req: &ClientRequest) -> ClientResult<()> {
        let text = encode_frame(req)?;
        debug!(verb = ?req.janus, "sending frame");
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Classifies one inbound frame.
    async fn route(&self, msg: ServerMessage) {
        let verb = msg.verb();
        if msg.is_async_event() {
            let Some(sender) = msg.sender() else {
                warn!(verb, "event without sender dropped");
                return;
            };
            let handle = self.handles.read().await.get(&sender).cloned();
            match handle {
                // One spawned task per event keeps a slow callback from
                // stalling the read loop.
                Some(handle) => {
                    tokio::spawn(async move { handle.dispatch(msg).await });
                }
                None => warn!(sender, verb, "event for unknown handle dropped"),
            }
            return;
        }

        let Some(txn) = msg.transaction().map(str::to_owned) else {
            warn!(verb, "frame without transaction dropped");
            return;
        };
        if !self.pending.resolve(&txn, msg).await {
            warn!(transaction = %txn, verb, "response for unknown transaction dropped");
        }
    }

    /// Tears the session down: closes the transport, stops the
    /// background tasks, fails every pending direct waiter and every
    /// handle's blocked two-phase caller. Idempotent.
    pub(crate) async fn teardown(&self, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session_id = self.id(), reason, "session teardown");
        let _ = self.shutdown.send(true);
        // Best effort on the wire; the transport may already be gone.
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::Close(None)).await {
                debug!(error = %e, "close frame not sent");
            }
            if let Err(e) = writer.close().await {
                debug!(error = %e, "transport close failed");
            }
        }
        self.pending.fail_all().await;
        let handles: Vec<Arc<Handle>> =
            self.handles.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.fail_waiters().await;
        }
    }
}

async fn read_loop(inner: Arc<SessionInner>, mut source: SplitStream<WsStream>) {
    let mut shutdown = inner.shutdown.subscribe();
    loop {
        let frame = tokio::select! {
            frame = source.next() => frame,
            _ = shutdown.changed() => break,
        };
        let Some(frame) = frame else {
            debug!("transport stream ended");
            break;
        };
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!(?frame, "close frame from gateway");
                break;
            }
            // Pings and pongs are answered by the transport layer.
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "transport read failed");
                break;
            }
        };
        let msg: ServerMessage = match decode_frame(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, frame = %text, "dropping undecodable frame");
                continue;
            }
        };
        inner.route(msg).await;
    }
    inner.teardown("read loop terminated").await;
}

async fn keepalive_loop(inner: Arc<SessionInner>) {
    let mut shutdown = inner.shutdown.subscribe();
    let mut ticks = tokio::time::interval(inner.config.keepalive_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks.tick().await;
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let req = ClientRequest::keepalive(inner.id());
                if let Err(e) = inner.request(req, inner.config.request_timeout).await {
                    // Not retried; a dead connection surfaces through
                    // the read loop or the next operation.
                    warn!(error = %e, "keepalive failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("keepalive task stopped");
}
