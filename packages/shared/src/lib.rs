//! Shared utilities for the pokerplan workspace.
//!
//! Small helpers used by both the server and client crates: tracing
//! subscriber setup and millisecond timestamps.

pub mod logger;
pub mod time;

pub use logger::setup_logger;
pub use time::now_millis;
