//! Server construction and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use pokerplan_shared::now_millis;

use crate::store::SWEEP_INTERVAL_SECS;
use crate::ui::handler::{health_check, server_stats, websocket_handler};
use crate::ui::signal::shutdown_signal;
use crate::ui::state::AppState;

/// Server configuration (from CLI flags).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Build the router over a shared state.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/stats", get(server_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until a shutdown signal arrives.
///
/// Constructs the one store for this process, spawns the idle-session
/// sweep, and serves the WebSocket and HTTP endpoints.
pub async fn run_server(config: ServerConfig) -> Result<(), std::io::Error> {
    let state = Arc::new(AppState::new());
    spawn_idle_sweep(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Periodic sweep that evicts idle sessions and frees their join codes.
fn spawn_idle_sweep(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        // The first tick fires immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            let evicted = state.store.lock().await.evict_idle(now_millis());
            for (session_id, join_code) in evicted {
                tracing::info!(
                    "Evicted idle session {} (join code {} freed)",
                    session_id,
                    join_code
                );
            }
        }
    });
}
