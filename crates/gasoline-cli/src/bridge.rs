//! Bridge mode (spec.md §4.9 step 1): proxy stdio JSON-RPC to an already
//! running daemon's `POST /mcp`, relaying each response back on stdout.
//! Used both by `--connect` and by a fresh process that discovers a live,
//! version-matching daemon already owns the port.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Runs until stdin closes (EOF) or a transport-fatal error occurs, in
/// which case the final line written is a JSON-RPC error (spec.md §7:
/// "bridge mode surfaces server crashes to the MCP client as a final
/// JSON-RPC error then exits").
pub async fn run(port: u16) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{port}/mcp");
    let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
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

        let body = match client.post(&url).body(trimmed.to_string()).send().await {
            Ok(response) => response.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
            Err(err) => fatal_response(&err.to_string()),
        };

        stdout.write_all(&body).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn fatal_response(message: &str) -> Vec<u8> {
    let response = gasoline_protocol::JsonRpcResponse::parse_error(format!("daemon unreachable: {message}"));
    serde_json::to_vec(&response).unwrap_or_default()
}
