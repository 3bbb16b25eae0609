//! WebSocket planning poker server implementation.

pub mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{ServerConfig, app, run_server};
