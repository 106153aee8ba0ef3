//! MCP method names and the payload shapes for `initialize` / `tools/list`.

use std::collections::HashMap;

use gasoline_types::{ServerInfo, Tool};
use serde::{Deserialize, Serialize};

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    pub protocol_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: serde_json::Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

impl InitializeResult {
    pub fn current() -> Self {
        let server_info = ServerInfo::current();
        Self {
            protocol_version: server_info.protocol_version.clone(),
            capabilities: serde_json::json!({ "tools": {} }),
            server_info,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
    #[serde(rename = "_meta")]
    pub meta: ToolsListMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListMeta {
    pub data_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}
