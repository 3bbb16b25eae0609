//! Shared test fixtures.
//!
//! Spawns the real router on a local port so tests drive the actual
//! WebSocket and HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use pokerplan_server::ui::{app, state::AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    port: u16,
}

impl TestServer {
    /// Spawn the server on the given port. Each test uses its own port so
    /// tests can run in parallel.
    pub fn start(port: u16) -> Self {
        let state = Arc::new(AppState::new());
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
                .await
                .expect("Failed to bind test listener");
            axum::serve(listener, app(state))
                .await
                .expect("Test server stopped");
        });
        Self { port }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Open a WebSocket connection, retrying while the server comes up.
    pub async fn connect(&self) -> WsClient {
        let url = self.ws_url();
        for _ in 0..50 {
            if let Ok((stream, _)) = connect_async(url.as_str()).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Failed to connect to {url}");
    }
}

/// Send one intent as a raw wire frame.
pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Receive the next text frame as JSON, bounded by a timeout.
pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
        }
    }
}

/// Receive the next event of the given type, failing on anything else.
pub async fn recv_event(ws: &mut WsClient, expected_type: &str) -> serde_json::Value {
    let event = recv_json(ws).await;
    assert_eq!(
        event["type"], expected_type,
        "unexpected event: {event}"
    );
    event["payload"].clone()
}
