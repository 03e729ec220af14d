//! Logging configuration
//!
//! Structured logging with tracing.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Initialize logging.
///
/// `RUST_LOG` takes priority when set; otherwise the configured level
/// applies to this crate only.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gluesync={level}")));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
