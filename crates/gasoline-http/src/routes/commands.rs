//! `/commands/poll`, `/commands/response` — the extension side of the
//! interact command rendezvous (spec.md §4.3, §5: 25 s long-poll deadline).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gasoline_types::CommandResponse;

use crate::HttpState;

const POLL_DEADLINE: Duration = Duration::from_secs(25);

/// `GET /commands/poll` — long-poll for the next pending interact command;
/// `204 No Content` once the deadline elapses with nothing queued.
pub async fn poll(State(state): State<Arc<HttpState>>) -> Response {
    match state.app.commands.poll(POLL_DEADLINE).await {
        Some(command) => Json(command).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// `POST /commands/response` — the extension's answer to a polled command.
pub async fn respond(
    State(state): State<Arc<HttpState>>,
    Json(response): Json<CommandResponse>,
) -> Json<serde_json::Value> {
    let delivered = state.app.commands.respond(response);
    Json(serde_json::json!({ "delivered": delivered }))
}
