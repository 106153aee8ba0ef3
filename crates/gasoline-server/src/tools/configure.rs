//! `configure { action, ... }` — spec.md §4.3/§4.8.

use chrono::Utc;
use gasoline_core::{CaptureSettings, ErrorKind, GasolineError, WsMode};
use gasoline_types::{Level, NoiseCategory, NoiseRule, ToolResult};
use serde::Deserialize;

use crate::history::HistoryEvent;
use crate::state::AppState;

const NOISE_NAMESPACE: &str = "config";
const NOISE_KEY: &str = "noise_rules";

#[derive(Debug, Default, Deserialize)]
struct ConfigureArgs {
    action: String,
    #[serde(default)]
    log_level: Option<Level>,
    #[serde(default)]
    ws_mode: Option<WsMode>,
    #[serde(default)]
    include_bodies: Option<bool>,
    #[serde(default)]
    ai_web_pilot_enabled: Option<bool>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    category: Option<NoiseCategory>,
    #[serde(default)]
    message_regex: Option<String>,
    #[serde(default)]
    source_regex: Option<String>,
    #[serde(default)]
    url_regex: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    related_to: Option<String>,
}

pub async fn handle(state: &AppState, arguments: serde_json::Value) -> ToolResult {
    let args: ConfigureArgs = match serde_json::from_value(arguments) {
        Ok(a) => a,
        Err(err) => return invalid_parameter("action", err.to_string()),
    };

    match args.action.as_str() {
        "capture" => configure_capture(state, &args),
        "store" => configure_store(state, &args).await,
        "load" => configure_load(state, &args).await,
        "list" => configure_list(state, &args).await,
        "noise_rule" => configure_noise_rule(state, &args).await,
        "dismiss_noise" => configure_dismiss_noise(state, &args).await,
        "record_event" => configure_record_event(state, &args),
        "reset" => configure_reset(state),
        other => invalid_parameter("action", format!("unknown discriminator '{other}'")),
    }
}

fn invalid_parameter(field: &str, message: impl Into<String>) -> ToolResult {
    ToolResult::error(GasolineError::invalid_parameter(field, message).as_tool_payload())
}

fn configure_capture(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let log_level = args.log_level;
    let ws_mode = args.ws_mode;
    let include_bodies = args.include_bodies;
    let ai_web_pilot_enabled = args.ai_web_pilot_enabled;

    let result = state.process.capture.apply(|settings: &mut CaptureSettings| {
        if let Some(level) = log_level {
            settings.log_level = level;
        }
        if let Some(mode) = ws_mode {
            settings.ws_mode = mode;
        }
        if let Some(include) = include_bodies {
            settings.include_bodies = include;
        }
        if let Some(enabled) = ai_web_pilot_enabled {
            settings.ai_web_pilot_enabled = enabled;
        }
    });

    match result {
        Ok(()) => ToolResult::ok(serde_json::json!({ "settings": state.capture_settings() })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

async fn configure_store(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let (Some(namespace), Some(key), Some(value)) =
        (args.namespace.clone(), args.key.clone(), args.value.clone())
    else {
        return invalid_parameter("namespace", "store requires namespace, key, and value");
    };

    match state.kv.save(&namespace, &key, value).await {
        Ok(()) => ToolResult::ok(serde_json::json!({ "stored": true, "namespace": namespace, "key": key })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

async fn configure_load(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let (Some(namespace), Some(key)) = (args.namespace.clone(), args.key.clone()) else {
        return invalid_parameter("namespace", "load requires namespace and key");
    };

    match state.kv.load(&namespace, &key).await {
        Ok(value) => ToolResult::ok(serde_json::json!({ "namespace": namespace, "key": key, "value": value })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

async fn configure_list(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let Some(namespace) = args.namespace.clone() else {
        let names = state.kv.namespace_names().await;
        return ToolResult::ok(serde_json::json!({ "namespaces": names }));
    };

    match state.kv.list(&namespace).await {
        Ok(keys) => ToolResult::ok(serde_json::json!({ "namespace": namespace, "keys": keys })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

async fn load_noise_rules(state: &AppState) -> Result<Vec<NoiseRule>, ToolResult> {
    match state.kv.load(NOISE_NAMESPACE, NOISE_KEY).await {
        Ok(Some(value)) => serde_json::from_value(value).map_err(|err| {
            ToolResult::error(
                GasolineError::new(ErrorKind::Internal, err.to_string()).as_tool_payload(),
            )
        }),
        Ok(None) => Ok(Vec::new()),
        Err(err) => Err(ToolResult::error(err.as_tool_payload())),
    }
}

async fn configure_noise_rule(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let Some(category) = args.category else {
        return invalid_parameter("category", "noise_rule requires a category");
    };

    let mut rules = match load_noise_rules(state).await {
        Ok(rules) => rules,
        Err(result) => return result,
    };

    let rule = NoiseRule {
        id: uuid::Uuid::new_v4().to_string(),
        category,
        message_regex: args.message_regex.clone(),
        source_regex: args.source_regex.clone(),
        url_regex: args.url_regex.clone(),
        method: args.method.clone(),
    };
    rules.push(rule.clone());

    match state
        .kv
        .save(NOISE_NAMESPACE, NOISE_KEY, serde_json::to_value(&rules).unwrap_or_default())
        .await
    {
        Ok(()) => ToolResult::ok(serde_json::json!({ "rule": rule })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

async fn configure_dismiss_noise(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let Some(rule_id) = args.rule_id.clone() else {
        return invalid_parameter("rule_id", "dismiss_noise requires a rule_id");
    };

    let mut rules = match load_noise_rules(state).await {
        Ok(rules) => rules,
        Err(result) => return result,
    };

    let before = rules.len();
    rules.retain(|rule| rule.id != rule_id);
    if rules.len() == before {
        return ToolResult::error(
            GasolineError::new(ErrorKind::InvalidParameter, "no such noise rule")
                .with_field("rule_id")
                .as_tool_payload(),
        );
    }

    match state
        .kv
        .save(NOISE_NAMESPACE, NOISE_KEY, serde_json::to_value(&rules).unwrap_or_default())
        .await
    {
        Ok(()) => ToolResult::ok(serde_json::json!({ "dismissed": rule_id })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

fn configure_record_event(state: &AppState, args: &ConfigureArgs) -> ToolResult {
    let (Some(event_type), Some(description)) =
        (args.event_type.clone(), args.description.clone())
    else {
        return invalid_parameter("type", "record_event requires type and description");
    };

    state.history.record(HistoryEvent {
        timestamp: Utc::now(),
        kind: event_type,
        description,
        origin: "agent".to_string(),
        related_to: args.related_to.clone(),
    });

    ToolResult::ok(serde_json::json!({ "recorded": true }))
}

fn configure_reset(state: &AppState) -> ToolResult {
    match state.process.capture.reset() {
        Ok(()) => ToolResult::ok(serde_json::json!({ "settings": state.capture_settings() })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state() -> std::sync::Arc<AppState> {
        let dir = tempfile::tempdir().unwrap();
        AppState::new(dir.path().to_path_buf(), None, HashSet::new())
    }

    #[tokio::test]
    async fn capture_rejects_unknown_action() {
        let result = handle(&state(), serde_json::json!({"action": "bogus"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn capture_applies_settings() {
        let result = handle(
            &state(),
            serde_json::json!({"action": "capture", "ai_web_pilot_enabled": true}),
        )
        .await;
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn store_then_load_roundtrips() {
        let state = state();
        let stored = handle(
            &state,
            serde_json::json!({"action": "store", "namespace": "ns", "key": "k", "value": 42}),
        )
        .await;
        assert!(!stored.is_error);

        let loaded = handle(
            &state,
            serde_json::json!({"action": "load", "namespace": "ns", "key": "k"}),
        )
        .await;
        assert!(!loaded.is_error);
    }

    #[tokio::test]
    async fn record_event_requires_type_and_description() {
        let result = handle(&state(), serde_json::json!({"action": "record_event"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let state = state();
        let first = handle(&state, serde_json::json!({"action": "reset"})).await;
        let second = handle(&state, serde_json::json!({"action": "reset"})).await;
        assert!(!first.is_error && !second.is_error);
    }
}
