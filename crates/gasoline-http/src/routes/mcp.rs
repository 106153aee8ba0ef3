//! `POST /mcp` — JSON-RPC 2.0 MCP over HTTP, the same [`Dispatcher`] the
//! stdio bridge drives (spec.md §4.2, §4.3).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use gasoline_protocol::{Dispatcher, JsonRpcRequest, JsonRpcResponse};

use crate::HttpState;

pub async fn handle(State(state): State<Arc<HttpState>>, body: Bytes) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return Json(JsonRpcResponse::parse_error(err.to_string())),
    };
    Json(state.mcp.dispatch(request).await)
}
