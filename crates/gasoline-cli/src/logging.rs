//! Startup logging (spec.md §6's optional `<state>/logs.jsonl`). Stderr
//! always gets human-readable output; stdout is reserved for the stdio
//! MCP transport's JSON-RPC lines and must never carry a log line.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Held for the life of the process; dropping it stops flushing the file
/// appender's background worker.
#[must_use]
pub struct LoggingGuard(#[allow(dead_code)] WorkerGuard);

pub fn init() -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let state_dir = crate::paths::state_dir();
    let _ = std::fs::create_dir_all(&state_dir);
    let file_appender = tracing_appender::rolling::never(&state_dir, "logs.jsonl");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().json().with_writer(non_blocking));

    // Only the first call in a process wins; harmless if logging was
    // already initialized (e.g. in an embedding test harness).
    let _ = registry.try_init();

    LoggingGuard(guard)
}
