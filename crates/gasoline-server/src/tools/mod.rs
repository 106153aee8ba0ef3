//! MCP tool registry and transport-agnostic dispatcher. One [`McpServer`]
//! implements [`gasoline_protocol::Dispatcher`]; both `gasoline-stdio` and
//! `gasoline-http`'s `/mcp` handler call it without knowing about each other.

mod analyze;
mod configure;
mod generate;
mod interact;
mod observe;
mod schemas;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gasoline_protocol::{
    Dispatcher, InitializeResult, JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, JsonRpcResponse,
    ToolsCallParams, ToolsListMeta, ToolsListResult, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};
use gasoline_types::ToolResult;

use crate::state::AppState;

pub struct McpServer {
    state: Arc<AppState>,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn is_known_tool(name: &str) -> bool {
        matches!(name, "observe" | "analyze" | "generate" | "configure" | "interact")
    }

    fn data_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        counts.insert("clusters".to_string(), self.state.clusters.lock().len());
        counts.insert("endpoints".to_string(), self.state.schema.lock().len());
        counts.insert("history".to_string(), self.state.history.len());
        counts
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        let request_id = uuid::Uuid::new_v4();
        let started = std::time::Instant::now();
        let span = tracing::info_span!("tool_call", tool = name, %request_id);
        let _enter = span.enter();

        let result = match name {
            "observe" => observe::handle(&self.state, arguments),
            "analyze" => analyze::handle(&self.state, arguments),
            "generate" => generate::handle(&self.state, arguments),
            "configure" => configure::handle(&self.state, arguments).await,
            "interact" => interact::handle(&self.state, arguments).await,
            other => ToolResult::error(serde_json::json!({
                "error": "unknown_tool",
                "message": format!("no such tool: {other}"),
            })),
        };

        tracing::info!(tool = name, duration_ms = started.elapsed().as_millis() as u64, "tool call completed");
        result
    }
}

#[async_trait]
impl Dispatcher for McpServer {
    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            METHOD_INITIALIZE => {
                let result = InitializeResult::current();
                JsonRpcResponse::success(
                    serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
                    request.id,
                )
            }
            METHOD_TOOLS_LIST => {
                let result = ToolsListResult {
                    tools: schemas::all_tools(),
                    meta: ToolsListMeta { data_counts: self.data_counts() },
                };
                JsonRpcResponse::success(
                    serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
                    request.id,
                )
            }
            METHOD_TOOLS_CALL => {
                let params: ToolsCallParams = match request.params {
                    Some(value) => match serde_json::from_value(value) {
                        Ok(p) => p,
                        Err(err) => {
                            return JsonRpcResponse::error_response(
                                JsonRpcError {
                                    code: JsonRpcErrorCode::InvalidParams.code(),
                                    message: err.to_string(),
                                    data: None,
                                },
                                request.id,
                            )
                        }
                    },
                    None => {
                        return JsonRpcResponse::error_response(
                            JsonRpcErrorCode::InvalidParams.into(),
                            request.id,
                        )
                    }
                };
                if !Self::is_known_tool(&params.name) {
                    return JsonRpcResponse::error_response(
                        JsonRpcError {
                            code: JsonRpcErrorCode::MethodNotFound.code(),
                            message: format!("unknown tool: {}", params.name),
                            data: None,
                        },
                        request.id,
                    );
                }
                let result = self.call_tool(&params.name, params.arguments).await;
                JsonRpcResponse::success(
                    serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
                    request.id,
                )
            }
            other => JsonRpcResponse::error_response(
                JsonRpcError {
                    code: JsonRpcErrorCode::MethodNotFound.code(),
                    message: format!("unknown method: {other}"),
                    data: None,
                },
                request.id,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn server() -> McpServer {
        let dir = tempfile::tempdir().unwrap();
        McpServer::new(AppState::new(dir.path().to_path_buf(), None, HashSet::new()))
    }

    #[tokio::test]
    async fn unknown_top_level_tool_name_yields_method_not_found() {
        let server = server();
        let request = JsonRpcRequest::new(
            METHOD_TOOLS_CALL,
            Some(serde_json::json!({"name": "not_a_real_tool", "arguments": {}})),
            gasoline_protocol::RequestId::Number(1),
        );
        let response = server.dispatch(request).await;
        assert!(response.is_error());
        match response.payload {
            gasoline_protocol::JsonRpcResponsePayload::Error { error } => {
                assert_eq!(error.code, JsonRpcErrorCode::MethodNotFound.code());
            }
            gasoline_protocol::JsonRpcResponsePayload::Success { .. } => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn known_tool_name_dispatches_successfully() {
        let server = server();
        let request = JsonRpcRequest::new(
            METHOD_TOOLS_CALL,
            Some(serde_json::json!({"name": "observe", "arguments": {"what": "errors"}})),
            gasoline_protocol::RequestId::Number(2),
        );
        let response = server.dispatch(request).await;
        assert!(!response.is_error());
    }
}
