//! `generate { type, options? }` — spec.md §4.3/§4.7. Every variant is a
//! pure transform over data already sitting in the store; nothing here
//! talks to the extension.

use gasoline_store::QueryFilter;
use gasoline_types::{ActionKind, ToolResult};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct GenerateOptions {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GenerateArgs {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: GenerateOptions,
}

pub fn handle(state: &AppState, arguments: serde_json::Value) -> ToolResult {
    let args: GenerateArgs = match serde_json::from_value(arguments) {
        Ok(a) => a,
        Err(err) => {
            return ToolResult::error(
                gasoline_core::GasolineError::invalid_parameter("type", err.to_string())
                    .as_tool_payload(),
            )
        }
    };

    match args.kind.as_str() {
        "har" => ToolResult::ok(generate_har(state, args.options.limit)),
        "sarif" => ToolResult::ok(generate_sarif(state)),
        "reproduction" => ToolResult::text(generate_reproduction(state, args.options.limit)),
        "openapi_stub" => ToolResult::text(state.schema.lock().openapi_stub()),
        "csp" => ToolResult::text(generate_csp(state)),
        "test" => ToolResult::text(generate_test(state, args.options.limit)),
        other => ToolResult::error(
            gasoline_core::GasolineError::invalid_parameter(
                "type",
                format!("unknown discriminator '{other}'"),
            )
            .as_tool_payload(),
        ),
    }
}

fn generate_har(state: &AppState, limit: Option<usize>) -> serde_json::Value {
    let filter = QueryFilter { limit, ..Default::default() };
    let bodies = state.capture.query_network_bodies(&filter);
    let entries: Vec<_> = bodies
        .iter()
        .map(|body| {
            serde_json::json!({
                "startedDateTime": body.captured_at.to_rfc3339(),
                "time": body.duration_ms,
                "request": {
                    "method": body.method,
                    "url": body.url,
                    "postData": body.request_body,
                },
                "response": {
                    "status": body.status,
                    "content": { "mimeType": body.content_type, "text": body.response_body },
                    "headers": body.response_headers.iter().map(|(k, v)| serde_json::json!({"name": k, "value": v})).collect::<Vec<_>>(),
                },
            })
        })
        .collect();

    serde_json::json!({
        "log": {
            "version": "1.2",
            "creator": { "name": "gasoline", "version": state.server_version },
            "entries": entries,
        }
    })
}

fn generate_sarif(state: &AppState) -> serde_json::Value {
    let audit = state.accessibility.get();
    let results = audit
        .as_ref()
        .and_then(|v| v.get("violations"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|violation| {
            let rule_id = violation
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown-rule")
                .to_string();
            let message = violation
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("accessibility violation")
                .to_string();
            serde_json::json!({
                "ruleId": rule_id,
                "level": "error",
                "message": { "text": message },
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({
        "version": "2.1.0",
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "runs": [{
            "tool": { "driver": { "name": "gasoline-accessibility", "version": state.server_version } },
            "results": results,
        }],
    })
}

fn generate_reproduction(state: &AppState, limit: Option<usize>) -> String {
    let actions = state.capture.query_actions(limit);
    if actions.is_empty() {
        return "# No recorded user actions yet\n".to_string();
    }
    render_action_script(&actions)
}

fn generate_test(state: &AppState, limit: Option<usize>) -> String {
    let actions = state.capture.query_actions(limit);
    if actions.is_empty() {
        return "# No recorded user actions yet\n".to_string();
    }
    let mut out = String::from("# Generated from recorded browser actions\n\n");
    out.push_str(&render_action_script(&actions));
    out
}

fn render_action_script(actions: &[gasoline_types::EnhancedAction]) -> String {
    let mut out = String::new();
    for action in actions {
        let target = action.selectors.best().unwrap_or("<unknown>");
        let line = match action.kind {
            ActionKind::Click => format!("click {target}"),
            ActionKind::Input => format!(
                "type {target} -> {}",
                action.value.as_deref().unwrap_or("")
            ),
            ActionKind::Select => format!(
                "select {target} -> {}",
                action.value.as_deref().unwrap_or("")
            ),
            ActionKind::Keypress => format!(
                "press {} in {target}",
                action.value.as_deref().unwrap_or("")
            ),
            ActionKind::Navigate => format!("navigate {}", action.url.as_deref().unwrap_or("")),
            ActionKind::Scroll => format!("scroll {target}"),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn generate_csp(state: &AppState) -> String {
    let bodies = state.capture.query_network_bodies(&QueryFilter::default());
    let reports = state.third_party.audit(&bodies);

    let mut script_src = vec!["'self'".to_string()];
    let mut connect_src = vec!["'self'".to_string()];
    let mut img_src = vec!["'self'".to_string()];

    for report in &reports {
        if matches!(report.risk, gasoline_analysis::RiskLevel::Critical) {
            continue;
        }
        connect_src.push(report.origin.clone());
        if report
            .resource_types
            .keys()
            .any(|ct| ct.contains("javascript") || ct.contains("script"))
        {
            script_src.push(report.origin.clone());
        }
        if report.resource_types.keys().any(|ct| ct.contains("image")) {
            img_src.push(report.origin.clone());
        }
    }

    format!(
        "script-src {};\nconnect-src {};\nimg-src {};\n",
        script_src.join(" "),
        connect_src.join(" "),
        img_src.join(" "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state() -> std::sync::Arc<AppState> {
        let dir = tempfile::tempdir().unwrap();
        AppState::new(dir.path().to_path_buf(), None, HashSet::new())
    }

    #[test]
    fn har_with_no_network_is_empty_log() {
        let result = handle(&state(), serde_json::json!({"type": "har"}));
        assert!(!result.is_error);
    }

    #[test]
    fn reproduction_with_no_actions_returns_hint_text() {
        let result = handle(&state(), serde_json::json!({"type": "reproduction"}));
        assert!(!result.is_error);
    }

    #[test]
    fn unknown_type_is_invalid_parameter() {
        let result = handle(&state(), serde_json::json!({"type": "bogus"}));
        assert!(result.is_error);
    }
}
