//! Transport-agnostic dispatch: both the stdio loop and the `/mcp` HTTP
//! handler call the same [`Dispatcher`], so adding a transport never means
//! re-implementing `initialize`/`tools/list`/`tools/call` semantics.

use async_trait::async_trait;

use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

/// Implemented once by `gasoline-server`'s `McpServer`.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse;
}
