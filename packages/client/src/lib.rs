//! Client synchronization layer for the pokerplan server.
//!
//! Holds the connection state machine with its reconnect policy, the local
//! session mirror reconciled from server events, and the command REPL.

pub mod connection;
pub mod error;
pub mod repl;
pub mod session;

pub use connection::{ConnectionManager, ConnectionStatus, ReconnectPolicy};
pub use error::ClientError;
pub use session::SessionView;
