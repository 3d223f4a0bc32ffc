//! In-process mock gateway for session tests.
//!
//! Each test spawns a one-shot WebSocket server with a scripted
//! conversation. The script runs on its own task; tests that assert
//! inside the script await the returned join handle so a script panic
//! fails the test.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

pub(crate) struct MockGateway {
    ws: WebSocketStream<TcpStream>,
}

/// Installs a subscriber once so `RUST_LOG` works under `cargo test`.
pub(crate) fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Binds an ephemeral port, serves exactly one connection with the
/// given script and returns the `ws://` address plus the script task.
pub(crate) async fn spawn<F, Fut>(script: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(MockGateway) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |_req: &handshake::server::Request, mut resp: handshake::server::Response| {
                resp.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    HeaderValue::from_static(janusgate_protocol::SUB_PROTOCOL),
                );
                Ok(resp)
            },
        )
        .await
        .unwrap();
        script(MockGateway { ws }).await;
    });
    (format!("ws://{addr}"), task)
}

impl MockGateway {
    /// Receives the next text frame as JSON. Panics if the client hangs
    /// up first.
    pub(crate) async fn recv(&mut self) -> Value {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).unwrap();
                }
                Some(Ok(_)) => continue,
                other => panic!("client went away: {other:?}"),
            }
        }
    }

    /// Sends a JSON frame.
    pub(crate) async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Sends raw text, bypassing JSON encoding.
    pub(crate) async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    /// Consumes the session-create request and confirms it with the
    /// given session id. Returns the transaction id used.
    pub(crate) async fn expect_create(&mut self, session_id: u64) -> String {
        let frame = self.recv().await;
        assert_eq!(frame["janus"], "create");
        let txn = frame["transaction"].as_str().unwrap().to_string();
        self.send(json!({"janus": "success", "transaction": txn, "data": {"id": session_id}}))
            .await;
        txn
    }

    /// Consumes an attach request and confirms it with the given handle
    /// id. Returns the transaction id used.
    pub(crate) async fn expect_attach(&mut self, handle_id: u64) -> String {
        let frame = self.recv().await;
        assert_eq!(frame["janus"], "attach");
        let txn = frame["transaction"].as_str().unwrap().to_string();
        self.send(json!({"janus": "success", "transaction": txn, "data": {"id": handle_id}}))
            .await;
        txn
    }

    /// Initiates a close handshake and waits for the client to complete
    /// it and drop the connection. Panics (and fails the awaiting test)
    /// if the client never finishes the handshake.
    pub(crate) async fn close_handshake(mut self) {
        self.ws.close(None).await.unwrap();
        while let Some(frame) = self.ws.next().await {
            if frame.is_err() {
                break;
            }
        }
    }

    /// Keeps the connection open, draining whatever the client still
    /// sends (keepalives, close), until the client hangs up.
    pub(crate) async fn idle(mut self) {
        while let Some(frame) = self.ws.next().await {
            if frame.is_err() {
                break;
            }
        }
    }
}

/// Polls a condition until it holds, failing the test after one second.
pub(crate) async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 1s");
}
