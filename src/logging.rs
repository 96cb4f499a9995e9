//! Logging and tracing configuration for bakcheck
//!
//! Structured logging uses the `tracing` crate. Call [`init`] once at startup;
//! library code only emits events.
//!
//! # Environment Variable Control
//!
//! Set `RUST_LOG` to control log levels at runtime:
//! ```bash
//! RUST_LOG=debug bakcheck backups/*.zip
//! RUST_LOG=bakcheck_lib::database=trace bakcheck staging.zip
//! RUST_LOG=warn bakcheck backups/*.zip
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) || cfg!(feature = "debug-logging") {
        EnvFilter::new("bakcheck=debug,bakcheck_lib=debug")
    } else {
        EnvFilter::new("bakcheck=info,bakcheck_lib=info")
    }
}

/// Initialize the logging/tracing system
///
/// Logs go to stderr so JSON results on stdout stay machine-readable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    // Ignore error if already set (tests, embedding callers)
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize logging with verbose output (file:line, thread IDs)
pub fn init_verbose() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .pretty(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Check if debug logging is enabled
#[inline]
pub fn is_debug_enabled() -> bool {
    tracing::enabled!(Level::DEBUG)
}
