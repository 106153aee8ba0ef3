//! Unified error type for the gasoline daemon.
//!
//! Handlers never panic or abort the process; every fallible path returns a
//! [`GasolineError`] that callers map onto the right surface (HTTP status,
//! JSON-RPC error object, or a structured tool-result text payload) rather
//! than a bespoke `Result<_, String>` per call site.

use serde::Serialize;

/// Result type alias used throughout the daemon.
pub type GasolineResult<T> = Result<T, GasolineError>;

/// Error classification, following the taxonomy in the ERROR HANDLING
/// DESIGN section: transport, capacity, validation, not-found, gated,
/// contract, and fatal errors each map to a distinct surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed JSON-RPC payload.
    ParseError,
    /// Well-formed JSON but not a valid JSON-RPC request.
    InvalidRequest,
    /// Unknown top-level tool name.
    MethodNotFound,
    /// A sub-handler parameter failed validation.
    InvalidParameter,
    /// Request body exceeded the configured size cap.
    PayloadTooLarge,
    /// Per-address token bucket exhausted.
    RateLimited,
    /// Global memory hard limit crossed; ingest is paused.
    MemoryLimitExceeded,
    /// A KV namespace or per-file quota would be exceeded.
    QuotaExceeded,
    /// Feature gated (AI Web Pilot disabled, no tab tracked).
    Gated,
    /// Unexpected internal failure.
    Internal,
    /// Disk or OS failure.
    Io,
}

/// A single structured error.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct GasolineError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl GasolineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message).with_field(field)
    }

    pub fn gated(reason: &'static str) -> Self {
        Self::new(ErrorKind::Gated, reason)
    }

    /// JSON-RPC 2.0 error code for this error, per the standard table plus
    /// the MCP-reserved application range.
    pub fn jsonrpc_code(&self) -> i32 {
        match self.kind {
            ErrorKind::ParseError => -32700,
            ErrorKind::InvalidRequest => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParameter => -32602,
            ErrorKind::Internal | ErrorKind::Io => -32603,
            ErrorKind::PayloadTooLarge
            | ErrorKind::RateLimited
            | ErrorKind::MemoryLimitExceeded
            | ErrorKind::QuotaExceeded
            | ErrorKind::Gated => -32000,
        }
    }

    /// HTTP status this error maps to on the ingestion surface.
    pub fn http_status(&self) -> u16 {
        match self.kind {
            ErrorKind::ParseError | ErrorKind::InvalidRequest | ErrorKind::InvalidParameter => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::RateLimited => 429,
            ErrorKind::MemoryLimitExceeded => 503,
            ErrorKind::MethodNotFound => 404,
            ErrorKind::Gated => 403,
            ErrorKind::QuotaExceeded => 507,
            ErrorKind::Internal | ErrorKind::Io => 500,
        }
    }

    /// Tool-result text payload for errors surfaced inside a tool call.
    /// Contract: these are never JSON-RPC errors (spec.md §4.3, §7).
    pub fn as_tool_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind,
            "message": self.message,
            "field": self.field,
        })
    }
}

impl From<serde_json::Error> for GasolineError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::ParseError, err.to_string())
    }
}

impl From<std::io::Error> for GasolineError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}
