//! Client-side error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The bounded connect-readiness gate expired before the connection
    /// reached the connected state.
    #[error("timed out waiting for the connection to open")]
    ConnectTimeout,

    /// The connection driver has shut down; no more messages can be sent.
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
