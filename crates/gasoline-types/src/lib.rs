//! Wire and domain types shared by every gasoline crate.
//!
//! This crate holds no behavior beyond small constructors and normalization
//! helpers — the capture store, analyzers, and MCP server all build on top
//! of these shapes without redefining them.

mod alert;
mod command;
mod mcp;
mod network;
mod performance;
mod telemetry;

pub use alert::{Alert, AlertSeverity};
pub use command::{Command, CommandKind, CommandResponse};
pub use mcp::{ContentBlock, ServerInfo, Tool, ToolResult};
pub use network::{EnhancedAction, ActionKind, NetworkBody, Selectors, WebSocketDirection,
    WebSocketEvent, WebSocketEventKind};
pub use performance::{PerformanceBaseline, PerformanceSnapshot};
pub use telemetry::{Checkpoint, EntryKind, Level, NoiseCategory, NoiseRule, TelemetryEntry};

use serde::{Deserialize, Serialize};

/// Identifies the browser tab a piece of telemetry originated from.
pub type TabId = u64;

/// Monotonic per-kind sequence id, reset to zero on process restart.
pub type SequenceId = u64;

/// A single free-form enrichment attached to a telemetry entry by the
/// extension (source-map-resolved frames, redux snapshots, etc). The server
/// never interprets the payload beyond storing and returning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrichment {
    /// Enrichment key, e.g. "source_map", "framework_ancestry".
    pub key: String,
    /// Opaque enrichment payload.
    pub data: serde_json::Value,
}

/// Framework-ancestry / state-snapshot bag attached by the extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiContext {
    /// Nearest component/framework ancestry chain, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub framework_ancestry: Vec<String>,
    /// Arbitrary state snapshot captured at error time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_snapshot: Option<serde_json::Value>,
}
