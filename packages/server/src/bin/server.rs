//! Planning poker session server.
//!
//! Serves the WebSocket endpoint together with the HTTP health/stats API.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pokerplan-server -- --host 127.0.0.1 --port 8080
//! ```

use clap::Parser;

use pokerplan_server::{ServerConfig, run_server};
use pokerplan_shared::setup_logger;

#[derive(Debug, Parser)]
#[command(name = "pokerplan-server", about = "Planning poker session server")]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    // Run the server
    if let Err(e) = run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
