//! Connection manager: transport state machine and reconnect policy.
//!
//! One manager per process drives a single WebSocket connection through
//! `disconnected -> connecting -> connected`, with `error` reachable from
//! `connecting`. The current status is published through a watch channel so
//! callers can gate actions on connectedness without polling.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use pokerplan_server::infrastructure::dto::websocket::{
    ClientMessage, Envelope, PingPayload, ServerMessage,
};

use crate::error::ClientError;

/// Default interval of the liveness ping while connected.
pub const PING_INTERVAL_SECS: u64 = 30;

/// Default bound on the connect-readiness gate.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Reconnect policy knobs (CLI-configurable).
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Automatic reconnection on unexpected close.
    pub enabled: bool,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Retries stop silently once this many consecutive attempts failed.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// Delay before the given retry attempt (1-based): base * 2^(attempt - 1).
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Handle to the connection driver task.
///
/// Cheap to clone; all clones share the same underlying connection.
#[derive(Clone)]
pub struct ConnectionManager {
    outbound: mpsc::UnboundedSender<String>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ConnectionManager {
    /// Spawn the driver for `url` and return the manager together with the
    /// stream of server events.
    pub fn connect(
        url: String,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        tokio::spawn(drive(url, policy, outbound_rx, event_tx, status_tx));

        (
            Self {
                outbound: outbound_tx,
                status: status_rx,
            },
            event_rx,
        )
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Wait until the connection is open, bounded by `timeout`.
    ///
    /// Connection-gated actions (create/join) call this instead of queuing
    /// indefinitely against a dead transport.
    pub async fn ensure_connected(&self, timeout: Duration) -> Result<(), ClientError> {
        let mut status = self.status.clone();
        let wait = async {
            loop {
                if *status.borrow() == ConnectionStatus::Connected {
                    return Ok(());
                }
                if status.changed().await.is_err() {
                    return Err(ClientError::ConnectionClosed);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ClientError::ConnectTimeout)?
    }

    /// Queue one intent for sending, wrapped in the wire envelope.
    pub fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(&Envelope::now(message))
            .map_err(|_| ClientError::ConnectionClosed)?;
        self.outbound
            .send(json)
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

/// Driver loop: connect, pump one session of traffic, apply the reconnect
/// policy, repeat.
async fn drive(
    url: String,
    policy: ReconnectPolicy,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ServerMessage>,
    status: watch::Sender<ConnectionStatus>,
) {
    let mut attempts: u32 = 0;
    loop {
        let _ = status.send(ConnectionStatus::Connecting);

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!("Connected to {}", url);
                // A successful open resets the retry counter
                attempts = 0;
                let _ = status.send(ConnectionStatus::Connected);
                pump(stream, &mut outbound, &events).await;
                let _ = status.send(ConnectionStatus::Disconnected);
            }
            Err(e) => {
                tracing::warn!("Connect to {} failed: {}", url, e);
                let _ = status.send(ConnectionStatus::Error);
            }
        }

        if !policy.enabled {
            return;
        }
        if attempts >= policy.max_attempts {
            // Budget exhausted; stop silently
            tracing::warn!("Reconnect attempts exhausted, giving up");
            return;
        }
        attempts += 1;
        let delay = reconnect_delay(policy.base_delay, attempts);
        tracing::info!("Reconnecting in {:?} (attempt {})", delay, attempts);
        tokio::time::sleep(delay).await;
    }
}

/// Pump one open connection until it closes: forward queued intents out,
/// parsed server events in, and a liveness ping on a fixed interval.
async fn pump(
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<ServerMessage>,
) {
    let (mut sink, mut source) = stream.split();
    let mut ping = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    // The first tick fires immediately; skip it
    ping.tick().await;

    loop {
        tokio::select! {
            msg = source.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        return;
                    }
                    None => return,
                };
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<Envelope<ServerMessage>>(text.as_str()) {
                            Ok(envelope) => {
                                if events.send(envelope.message).is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Unparseable server event: {}", e);
                            }
                        }
                    }
                    Message::Close(_) => return,
                    _ => {}
                }
            }
            text = outbound.recv() => {
                let Some(text) = text else { return };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            _ = ping.tick() => {
                let envelope = Envelope::now(ClientMessage::Ping(PingPayload {}));
                let Ok(json) = serde_json::to_string(&envelope) else { continue };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_doubles_per_attempt() {
        // テスト項目: 再接続待ち時間が base × 2^(attempt−1) で伸びる
        // given (前提条件):
        let base = Duration::from_secs(1);

        // when (操作) / then (期待する結果):
        assert_eq!(reconnect_delay(base, 1), Duration::from_secs(1));
        assert_eq!(reconnect_delay(base, 2), Duration::from_secs(2));
        assert_eq!(reconnect_delay(base, 3), Duration::from_secs(4));
        assert_eq!(reconnect_delay(base, 5), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_driver_stops_silently_after_retry_budget() {
        // テスト項目: 再試行予算を使い切るとドライバが静かに終了する
        // given (前提条件): 接続できない URL と小さな再試行予算
        let policy = ReconnectPolicy {
            enabled: true,
            base_delay: Duration::from_millis(1),
            max_attempts: 2,
        };
        let (manager, mut events) =
            ConnectionManager::connect("ws://127.0.0.1:1/ws".to_string(), policy);

        // when (操作): イベントチャネルが閉じるまで待つ
        let closed = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("driver should give up within the retry budget");

        // then (期待する結果): ドライバ終了後はイベントも状態遷移も発生しない
        assert!(closed.is_none());
        assert_eq!(manager.status(), ConnectionStatus::Error);
        let gate = manager
            .ensure_connected(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(gate, ClientError::ConnectionClosed));
    }

    #[test]
    fn test_default_policy_limits_attempts() {
        // テスト項目: 既定の再接続ポリシーは 5 回で打ち切る
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // then (期待する結果):
        assert!(policy.enabled);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}
