use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of browser action an `interact` tool call wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    HighlightElement,
    ExecuteJavascript,
    ManageState,
    Navigate,
    Click,
    Type,
    Scroll,
    FillForm,
}

impl CommandKind {
    /// Default command timeout; `execute_javascript` gets a longer one.
    pub fn default_timeout(&self) -> std::time::Duration {
        match self {
            CommandKind::ExecuteJavascript => std::time::Duration::from_secs(30),
            _ => std::time::Duration::from_secs(10),
        }
    }
}

/// A pending interact command. Created by the MCP tool call, removed by the
/// extension's long-poll, completed by the extension posting a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub kind: CommandKind,
    #[serde(default)]
    pub arguments: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub timeout: std::time::Duration,
}

/// The extension's answer to a `Command`, posted back to `/commands/response`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
