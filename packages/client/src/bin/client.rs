//! Planning poker CLI client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pokerplan-client -- --name Alice
//! ```

use std::time::Duration;

use clap::Parser;

use pokerplan_client::connection::{CONNECT_TIMEOUT_SECS, ConnectionManager, ReconnectPolicy};
use pokerplan_client::repl::run_repl;
use pokerplan_shared::setup_logger;

#[derive(Debug, Parser)]
#[command(name = "pokerplan-client", about = "Planning poker CLI client")]
struct Args {
    /// WebSocket endpoint of the server
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Your display name
    #[arg(long)]
    name: String,

    /// Disable automatic reconnection on connection loss
    #[arg(long)]
    no_reconnect: bool,

    /// Base reconnect delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    reconnect_base_ms: u64,

    /// Maximum number of reconnect attempts
    #[arg(long, default_value_t = 5)]
    reconnect_max_attempts: u32,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing (quiet by default; the REPL owns stdout)
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let policy = ReconnectPolicy {
        enabled: !args.no_reconnect,
        base_delay: Duration::from_millis(args.reconnect_base_ms),
        max_attempts: args.reconnect_max_attempts,
    };

    let (manager, events) = ConnectionManager::connect(args.url.clone(), policy);

    if let Err(e) = manager
        .ensure_connected(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .await
    {
        eprintln!("could not connect to {}: {}", args.url, e);
        std::process::exit(1);
    }

    if let Err(e) = run_repl(manager, events, args.name).await {
        eprintln!("client error: {e}");
        std::process::exit(1);
    }
}
