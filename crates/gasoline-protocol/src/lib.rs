//! JSON-RPC 2.0 envelope and the transport-agnostic MCP dispatch trait.

pub mod dispatch;
pub mod jsonrpc;
pub mod methods;

pub use dispatch::Dispatcher;
pub use jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, JsonRpcResponse, JsonRpcResponsePayload,
    JsonRpcVersion, RequestId, ResponseId,
};
pub use methods::{
    InitializeParams, InitializeResult, ToolsCallParams, ToolsListMeta, ToolsListResult,
    METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
