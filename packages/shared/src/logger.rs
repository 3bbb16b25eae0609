//! Tracing subscriber setup shared by all binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The filter defaults to `<bin_name>=<default_level>` but can be overridden
/// with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `bin_name` - Binary name used as the default filter target
/// * `default_level` - Default log level when `RUST_LOG` is not set
pub fn setup_logger(bin_name: &str, default_level: &str) {
    // Binary names use '-', tracing targets use '_'
    let target = bin_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{target}={default_level},pokerplan_server={default_level},pokerplan_client={default_level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
