//! Planning poker session server library.
//!
//! Provides the authoritative in-memory session store, the WebSocket
//! message router with broadcast fan-out, and the Axum server runner.

pub mod domain;
pub mod infrastructure;
pub mod store;
pub mod ui;

pub use ui::{ServerConfig, run_server};
