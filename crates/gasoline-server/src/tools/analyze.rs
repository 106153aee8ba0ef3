//! `analyze { target, query? }` — spec.md §4.3/§4.5.

use chrono::{DateTime, Utc};
use gasoline_types::ToolResult;
use serde::Deserialize;

use crate::state::AppState;

/// Load-regression threshold past which `analyze { target: "performance" }`
/// flags a URL (spec.md §4.5).
const REGRESSION_THRESHOLD_PCT: f64 = 25.0;

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    since: Option<DateTime<Utc>>,
    #[serde(default)]
    until: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    related_to: Option<String>,
    #[serde(default)]
    checkpoint: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    target: String,
    #[serde(default)]
    query: AnalyzeQuery,
}

pub fn handle(state: &AppState, arguments: serde_json::Value) -> ToolResult {
    let args: AnalyzeArgs = match serde_json::from_value(arguments) {
        Ok(a) => a,
        Err(err) => {
            return ToolResult::error(
                gasoline_core::GasolineError::invalid_parameter("target", err.to_string())
                    .as_tool_payload(),
            )
        }
    };

    match args.target.as_str() {
        "performance" => ToolResult::ok(analyze_performance(state, &args.query)),
        "api" => ToolResult::ok(analyze_api(state)),
        "accessibility" => ToolResult::ok(analyze_accessibility(state)),
        "changes" => analyze_changes(state, &args.query),
        "errors" => ToolResult::ok(analyze_errors(state)),
        "history" => ToolResult::ok(analyze_history(state, &args.query)),
        other => ToolResult::error(
            gasoline_core::GasolineError::invalid_parameter(
                "target",
                format!("unknown discriminator '{other}'"),
            )
            .as_tool_payload(),
        ),
    }
}

fn analyze_performance(state: &AppState, query: &AnalyzeQuery) -> serde_json::Value {
    let latest = match state.capture.performance_latest() {
        Some(snapshot) => snapshot,
        None => return serde_json::json!({ "hint": "No performance snapshots captured yet" }),
    };

    let url = query.url.as_deref().unwrap_or(&latest.url);
    let baseline = state.capture.performance_baseline(url);
    let regression_pct = baseline.as_ref().map(|b| b.load_regression_pct(&latest));
    let regressed = regression_pct.map(|pct| pct >= REGRESSION_THRESHOLD_PCT).unwrap_or(false);

    serde_json::json!({
        "url": url,
        "latest": latest,
        "baseline": baseline,
        "regression_pct": regression_pct,
        "regressed": regressed,
    })
}

fn analyze_api(state: &AppState) -> serde_json::Value {
    let schema = state.schema.lock();
    let contract = state.contract.lock();
    let endpoints: Vec<_> = schema
        .endpoints()
        .map(|endpoint| {
            let key = gasoline_analysis::schema::SchemaStore::endpoint_key(
                &endpoint.method,
                &endpoint.normalized_path,
            );
            serde_json::json!({
                "endpoint": endpoint,
                "violations": contract.violations(&key),
                "established": contract.is_established(&key),
                "is_auth_endpoint": endpoint.is_auth_endpoint(),
            })
        })
        .collect();

    if endpoints.is_empty() {
        return serde_json::json!({ "hint": "No network traffic observed yet", "endpoints": [] });
    }
    serde_json::json!({ "endpoints": endpoints })
}

fn analyze_accessibility(state: &AppState) -> serde_json::Value {
    match state.accessibility.get() {
        Some(result) => serde_json::json!({ "accessibility": result }),
        None => serde_json::json!({ "hint": "No accessibility audit captured yet" }),
    }
}

fn analyze_changes(state: &AppState, query: &AnalyzeQuery) -> ToolResult {
    let Some(name) = query.checkpoint.clone() else {
        let checkpoint = state.capture.checkpoint(None);
        return ToolResult::ok(serde_json::json!({ "checkpoint": checkpoint }));
    };

    match state.capture.diff_since(&name) {
        Ok(entries) => ToolResult::ok(serde_json::json!({ "since": name, "changes": entries })),
        Err(err) => ToolResult::error(err.as_tool_payload()),
    }
}

fn analyze_errors(state: &AppState) -> serde_json::Value {
    let clusters = state.clusters.lock();
    let grouped: Vec<_> = clusters
        .clusters()
        .map(|cluster| {
            let mut value = serde_json::to_value(cluster).unwrap_or(serde_json::Value::Null);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("root_cause".to_string(), serde_json::Value::String(cluster.root_cause()));
            }
            value
        })
        .collect::<Vec<_>>();
    serde_json::json!({
        "clusters": grouped,
        "cluster_count": clusters.len(),
        "unclustered_count": clusters.unclustered_count(),
    })
}

fn analyze_history(state: &AppState, query: &AnalyzeQuery) -> serde_json::Value {
    let events = state.history.query(
        query.since,
        query.until,
        query.event_type.as_deref(),
        query.pattern.as_deref(),
        query.related_to.as_deref(),
    );
    serde_json::json!({ "events": events, "data_counts": { "history": events.len() } })
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
    fn performance_with_no_data_returns_hint() {
        let result = handle(&state(), serde_json::json!({"target": "performance"}));
        assert!(!result.is_error);
    }

    #[test]
    fn errors_target_reports_unclustered_count() {
        let result = handle(&state(), serde_json::json!({"target": "errors"}));
        assert!(!result.is_error);
    }

    #[test]
    fn unknown_target_is_invalid_parameter() {
        let result = handle(&state(), serde_json::json!({"target": "bogus"}));
        assert!(result.is_error);
    }
}
