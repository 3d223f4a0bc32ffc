//! Scripted one-shot WebSocket gateway for adapter scenario tests.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

pub struct Gateway {
    ws: WebSocketStream<TcpStream>,
}

/// Serves one connection with the given script on an ephemeral port and
/// returns the `ws://` address to dial.
pub async fn serve<F, Fut>(script: F) -> String
where
    F: FnOnce(Gateway) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
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
        script(Gateway { ws }).await;
    });
    format!("ws://{addr}")
}

impl Gateway {
    /// Next text frame as JSON.
    pub async fn recv(&mut self) -> Value {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("client went away: {other:?}"),
            }
        }
    }

    pub async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Answers the session-create and plugin-attach handshakes with the
    /// given ids.
    pub async fn handshake(&mut self, session_id: u64, handle_id: u64) {
        for (verb, id) in [("create", session_id), ("attach", handle_id)] {
            let frame = self.recv().await;
            assert_eq!(frame["janus"], verb);
            let txn = frame["transaction"].as_str().unwrap();
            self.send(json!({"janus": "success", "transaction": txn, "data": {"id": id}}))
                .await;
        }
    }

    /// Answers the next plugin message with an acknowledgement followed
    /// by a result event, returning the request body that was sent.
    pub async fn answer_two_phase(&mut self, sender: u64, plugindata: Value, jsep: Value) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame["janus"], "message");
        let txn = frame["transaction"].as_str().unwrap().to_string();
        self.send(json!({"janus": "ack", "transaction": txn})).await;
        let mut event = json!({
            "janus": "event",
            "transaction": txn,
            "sender": sender,
            "plugindata": plugindata
        });
        if !jsep.is_null() {
            event["jsep"] = jsep;
        }
        self.send(event).await;
        frame["body"].clone()
    }

    /// Keeps the connection open until the client hangs up.
    pub async fn idle(mut self) {
        while let Some(frame) = self.ws.next().await {
            if frame.is_err() {
                break;
            }
        }
    }
}
