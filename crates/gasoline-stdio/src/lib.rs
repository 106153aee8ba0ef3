//! Line-delimited JSON-RPC over stdin/stdout (spec.md §4.3).
//!
//! One request per line in, one response per line out, driving the same
//! [`Dispatcher`] `gasoline-http`'s `/mcp` handler drives. Gasoline has no
//! server-initiated calls over this transport — the interact command
//! channel is polled over HTTP by the extension — so unlike a general MCP
//! line transport this runner is one-directional: read, dispatch, write.

use std::sync::Arc;

use gasoline_protocol::{
    Dispatcher, JsonRpcError, JsonRpcErrorCode, JsonRpcResponse, JsonRpcResponsePayload,
    ResponseId,
};
use gasoline_server::McpServer;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Prevents an unbounded line from pinning memory before it's ever parsed.
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Runs the stdio transport to completion, reading from `reader` and
/// writing to `writer` until the input stream closes (EOF).
pub async fn run<R, W>(mcp: Arc<McpServer>, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.len() > MAX_MESSAGE_SIZE {
            let response = oversized_error();
            write_response(&mut writer, &response).await?;
            continue;
        }

        let response = match serde_json::from_str(trimmed) {
            Ok(request) => mcp.dispatch(request).await,
            Err(err) => JsonRpcResponse::parse_error(err.to_string()),
        };

        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

/// Runs the stdio transport against the process's real stdin/stdout.
pub async fn run_stdio(mcp: Arc<McpServer>) -> std::io::Result<()> {
    run(mcp, tokio::io::stdin(), tokio::io::stdout()).await
}

fn oversized_error() -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: gasoline_protocol::JsonRpcVersion,
        payload: JsonRpcResponsePayload::Error {
            error: JsonRpcError {
                code: JsonRpcErrorCode::InvalidRequest.code(),
                message: format!("message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"),
                data: None,
            },
        },
        id: ResponseId::null(),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let serialized = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"failed to serialize response"},"id":null}"#.to_string());
    writer.write_all(serialized.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Cursor;
    use tokio::io::BufReader as TokioBufReader;

    fn mcp() -> Arc<McpServer> {
        let dir = tempfile::tempdir().unwrap();
        let app = gasoline_server::AppState::new(dir.path().to_path_buf(), None, HashSet::new());
        Arc::new(McpServer::new(app))
    }

    #[tokio::test]
    async fn dispatches_a_single_line_request() {
        let input = b"{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"params\":{},\"id\":1}\n".to_vec();
        let reader = TokioBufReader::new(Cursor::new(input));
        let mut output = Vec::new();

        run(mcp(), reader, &mut output).await.unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str.lines().count(), 1);
        assert!(output_str.contains("\"jsonrpc\":\"2.0\""));
    }

    #[tokio::test]
    async fn skips_blank_lines() {
        let input = b"\n\n{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\",\"params\":{},\"id\":2}\n\n".to_vec();
        let reader = TokioBufReader::new(Cursor::new(input));
        let mut output = Vec::new();

        run(mcp(), reader, &mut output).await.unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str.matches("jsonrpc").count(), 1);
    }

    #[tokio::test]
    async fn malformed_json_yields_parse_error_not_a_crash() {
        let input = b"not json at all\n".to_vec();
        let reader = TokioBufReader::new(Cursor::new(input));
        let mut output = Vec::new();

        run(mcp(), reader, &mut output).await.unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("-32700"));
    }

    #[tokio::test]
    async fn oversized_line_gets_invalid_request_not_dropped() {
        let oversized = "x".repeat(MAX_MESSAGE_SIZE + 1);
        let input = format!("{oversized}\n{{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\",\"params\":{{}},\"id\":3}}\n");
        let reader = TokioBufReader::new(Cursor::new(input.into_bytes()));
        let mut output = Vec::new();

        run(mcp(), reader, &mut output).await.unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str.lines().count(), 2);
        assert!(output_str.lines().next().unwrap().contains("-32600"));
    }
}
