//! `observe { what, selector?, limit? }` — spec.md §4.3/§4.4.

use gasoline_core::ErrorKind;
use gasoline_store::QueryFilter;
use gasoline_types::{EntryKind, Level, ToolResult};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ObserveArgs {
    what: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

pub fn handle(state: &AppState, arguments: serde_json::Value) -> ToolResult {
    let args: ObserveArgs = match serde_json::from_value(arguments) {
        Ok(a) => a,
        Err(err) => return invalid_parameter("what", err.to_string()),
    };

    let filter = QueryFilter {
        url_contains: args.selector.clone(),
        limit: args.limit,
        ..Default::default()
    };

    let payload = match args.what.as_str() {
        "errors" => observe_errors(state, &filter),
        "logs" => observe_logs(state, &filter),
        "network" => observe_network(state, &filter),
        "websocket" => observe_websocket(state, &filter),
        "websocket_status" => observe_websocket_status(state),
        "actions" => observe_actions(state, args.limit),
        "page" => observe_page(state),
        "accessibility" | "a11y_tree" => observe_accessibility(state),
        other => {
            return invalid_parameter(
                "what",
                format!("unknown discriminator '{other}'"),
            )
        }
    };

    let alerts = state.alerts.drain();
    let mut envelope = payload;
    if let serde_json::Value::Object(ref mut map) = envelope {
        map.insert("alerts".to_string(), serde_json::to_value(&alerts).unwrap_or_default());
        map.insert(
            "_meta".to_string(),
            serde_json::json!({ "warnings": Vec::<String>::new() }),
        );
    }
    ToolResult::ok(envelope)
}

fn invalid_parameter(field: &str, message: impl Into<String>) -> ToolResult {
    ToolResult::error(
        gasoline_core::GasolineError::invalid_parameter(field, message).as_tool_payload(),
    )
}

fn observe_errors(state: &AppState, filter: &QueryFilter) -> serde_json::Value {
    let mut errors: Vec<_> = state
        .capture
        .query_console(EntryKind::Console, filter)
        .into_iter()
        .filter(|e| matches!(e.level, Level::Error))
        .chain(state.capture.query_console(EntryKind::Exception, filter))
        .collect();
    errors.sort_by_key(|e| e.sequence);

    if errors.is_empty() {
        return serde_json::json!({ "hint": "No browser logs or errors captured yet", "errors": [] });
    }
    serde_json::json!({ "errors": errors, "data_counts": { "errors": errors.len() } })
}

fn observe_logs(state: &AppState, filter: &QueryFilter) -> serde_json::Value {
    let logs = state.capture.query_console(EntryKind::Console, filter);
    if logs.is_empty() {
        return serde_json::json!({ "hint": "No browser logs captured yet", "logs": [] });
    }
    serde_json::json!({ "logs": logs, "data_counts": { "logs": logs.len() } })
}

fn observe_network(state: &AppState, filter: &QueryFilter) -> serde_json::Value {
    let bodies = state.capture.query_network_bodies(filter);
    if bodies.is_empty() {
        return serde_json::json!({ "hint": "No network activity captured yet", "network": [] });
    }
    serde_json::json!({ "network": bodies, "data_counts": { "network": bodies.len() } })
}

fn observe_websocket(state: &AppState, filter: &QueryFilter) -> serde_json::Value {
    let events = state.capture.query_websocket(filter);
    if events.is_empty() {
        return serde_json::json!({ "hint": "No websocket activity captured yet", "websocket": [] });
    }
    serde_json::json!({ "websocket": events, "data_counts": { "websocket": events.len() } })
}

fn observe_websocket_status(state: &AppState) -> serde_json::Value {
    let events = state.capture.query_websocket(&QueryFilter::default());
    let mut open: std::collections::HashSet<String> = std::collections::HashSet::new();
    for event in &events {
        match event.event {
            gasoline_types::WebSocketEventKind::Open => {
                open.insert(event.connection_id.clone());
            }
            gasoline_types::WebSocketEventKind::Close => {
                open.remove(&event.connection_id);
            }
            gasoline_types::WebSocketEventKind::Message => {}
        }
    }
    serde_json::json!({ "open_connections": open.len(), "connection_ids": open })
}

fn observe_actions(state: &AppState, limit: Option<usize>) -> serde_json::Value {
    let actions = state.capture.query_actions(limit);
    if actions.is_empty() {
        return serde_json::json!({ "hint": "No recorded user actions yet", "actions": [] });
    }
    serde_json::json!({ "actions": actions, "data_counts": { "actions": actions.len() } })
}

fn observe_page(state: &AppState) -> serde_json::Value {
    match state.process.tracked_tab.current() {
        Some(tab_id) => serde_json::json!({
            "tab_id": tab_id,
            "url": state.process.tracked_tab.current_url(),
        }),
        None => serde_json::json!({ "error": ErrorKind::Gated, "hint": "no_tab_tracked" }),
    }
}

fn observe_accessibility(state: &AppState) -> serde_json::Value {
    match state.accessibility.get() {
        Some(result) => serde_json::json!({ "accessibility": result }),
        None => serde_json::json!({ "hint": "No accessibility audit captured yet" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn state() -> Arc<AppState> {
        let dir = tempfile::tempdir().unwrap();
        AppState::new(dir.path().to_path_buf(), None, HashSet::new())
    }

    #[test]
    fn errors_with_no_data_returns_hint() {
        let state = state();
        let result = handle(&state, serde_json::json!({"what": "errors"}));
        assert!(!result.is_error);
    }

    #[test]
    fn unknown_what_is_invalid_parameter() {
        let state = state();
        let result = handle(&state, serde_json::json!({"what": "bogus"}));
        assert!(result.is_error);
    }

    #[test]
    fn page_without_tracked_tab_is_gated() {
        let state = state();
        let result = handle(&state, serde_json::json!({"what": "page"}));
        assert!(!result.is_error);
    }
}
