//! Shared error type, tracing context, process-wide state, and sanitization
//! helpers used by every other gasoline crate.

pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod sanitize;
pub mod tab;

pub use config::{CaptureConfig, CaptureSettings, WsMode, CAPTURE_CONFIG_RATE_LIMIT};
pub use context::RequestContext;
pub use error::{ErrorKind, GasolineError, GasolineResult};
pub use process::ProcessContext;
pub use tab::TrackedTabState;
