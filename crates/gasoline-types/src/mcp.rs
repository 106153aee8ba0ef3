use serde::{Deserialize, Serialize};

/// An MCP-exposed tool and its JSON Schema for `arguments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// One block of a tool's result content. Gasoline only ever emits `text`
/// blocks — structured payloads are JSON-encoded into `text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn json(value: &impl Serialize) -> Self {
        ContentBlock::Text {
            text: serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }
}

/// The result of a `tools/call`. Errors surfaced by a tool handler (bad
/// params, gated feature, missing data) are still `ToolResult`s with
/// `is_error = true` text content, never JSON-RPC errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(value: impl Serialize) -> Self {
        Self {
            content: vec![ContentBlock::json(&value)],
            is_error: false,
        }
    }

    pub fn error(value: impl Serialize) -> Self {
        Self {
            content: vec![ContentBlock::json(&value)],
            is_error: true,
        }
    }

    /// Plain-text result (generated scripts, YAML/CSP output) rather than a
    /// JSON-encoded payload.
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(s)],
            is_error: false,
        }
    }
}

/// Server identity reported from `initialize` and used by the bridge/health
/// endpoint to detect version skew.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

impl ServerInfo {
    pub const PROTOCOL_VERSION: &'static str = "2024-11-05";

    pub fn current() -> Self {
        Self {
            name: "gasoline".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: Self::PROTOCOL_VERSION.to_string(),
        }
    }
}
