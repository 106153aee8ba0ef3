//! `/logs`, `/websocket-events`, `/network-bodies`, `/enhanced-actions`,
//! `/performance` — batched telemetry ingest and read-back (spec.md §4.1,
//! §4.2).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use gasoline_store::{AppendOutcome, QueryFilter};
use gasoline_types::{EntryKind, WebSocketDirection};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::HttpState;

fn parse_entry_kind(raw: Option<&str>) -> EntryKind {
    match raw {
        Some("exception") => EntryKind::Exception,
        Some("network") => EntryKind::Network,
        _ => EntryKind::Console,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    url_contains: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LogsBatch {
    entries: Vec<gasoline_types::TelemetryEntry>,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    accepted: usize,
    merged: usize,
    dropped_wrong_tab: usize,
}

/// `POST /logs` — batched console/exception/network-error ingest.
pub async fn ingest_logs(
    State(state): State<Arc<HttpState>>,
    Json(batch): Json<LogsBatch>,
) -> Result<Json<IngestSummary>, ApiError> {
    let mut summary = IngestSummary::default();
    for entry in batch.entries {
        match state.app.capture.append_entry(entry)? {
            AppendOutcome::Stored => summary.accepted += 1,
            AppendOutcome::Merged => summary.merged += 1,
            AppendOutcome::DroppedWrongTab => summary.dropped_wrong_tab += 1,
        }
    }
    Ok(Json(summary))
}

/// `GET /logs` — read back a console/exception/network-error slice.
pub async fn read_logs(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<gasoline_types::TelemetryEntry>> {
    let kind = parse_entry_kind(query.kind.as_deref());
    let filter = QueryFilter {
        url_contains: query.url_contains,
        limit: query.limit,
        ..Default::default()
    };
    Json(state.app.capture.query_console(kind, &filter))
}

/// `DELETE /logs` — clear one kind's ring.
pub async fn clear_logs(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<LogsQuery>,
) -> Json<serde_json::Value> {
    state.app.capture.clear_entries(parse_entry_kind(query.kind.as_deref()));
    Json(serde_json::json!({ "cleared": true }))
}

#[derive(Debug, Deserialize)]
pub struct WebSocketEventsBatch {
    events: Vec<gasoline_types::WebSocketEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebSocketEventsQuery {
    url_contains: Option<String>,
    direction: Option<WebSocketDirection>,
    limit: Option<usize>,
}

/// `POST /websocket-events`.
pub async fn ingest_websocket(
    State(state): State<Arc<HttpState>>,
    Json(batch): Json<WebSocketEventsBatch>,
) -> Result<Json<IngestSummary>, ApiError> {
    let mut summary = IngestSummary::default();
    for event in batch.events {
        state.app.capture.append_websocket(event)?;
        summary.accepted += 1;
    }
    Ok(Json(summary))
}

/// `GET /websocket-events`.
pub async fn read_websocket(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<WebSocketEventsQuery>,
) -> Json<Vec<gasoline_types::WebSocketEvent>> {
    let filter = QueryFilter {
        url_contains: query.url_contains,
        direction: query.direction,
        limit: query.limit,
        ..Default::default()
    };
    Json(state.app.capture.query_websocket(&filter))
}

#[derive(Debug, Deserialize)]
pub struct NetworkBodiesBatch {
    bodies: Vec<gasoline_types::NetworkBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetworkBodiesQuery {
    url_contains: Option<String>,
    method: Option<String>,
    status_min: Option<u16>,
    status_max: Option<u16>,
    limit: Option<usize>,
}

/// `POST /network-bodies`.
pub async fn ingest_network_bodies(
    State(state): State<Arc<HttpState>>,
    Json(batch): Json<NetworkBodiesBatch>,
) -> Result<Json<IngestSummary>, ApiError> {
    let mut summary = IngestSummary::default();
    for body in batch.bodies {
        state.app.capture.append_network_body(body)?;
        summary.accepted += 1;
    }
    Ok(Json(summary))
}

/// `GET /network-bodies`.
pub async fn read_network_bodies(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<NetworkBodiesQuery>,
) -> Json<Vec<gasoline_types::NetworkBody>> {
    let filter = QueryFilter {
        url_contains: query.url_contains,
        method: query.method,
        status_min: query.status_min,
        status_max: query.status_max,
        limit: query.limit,
        ..Default::default()
    };
    Json(state.app.capture.query_network_bodies(&filter))
}

#[derive(Debug, Deserialize)]
struct ActionIngest {
    #[serde(flatten)]
    action: gasoline_types::EnhancedAction,
    #[serde(default)]
    is_password_field: bool,
}

#[derive(Debug, Deserialize)]
pub struct EnhancedActionsBatch {
    actions: Vec<ActionIngest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnhancedActionsQuery {
    limit: Option<usize>,
}

/// `POST /enhanced-actions`.
pub async fn ingest_actions(
    State(state): State<Arc<HttpState>>,
    Json(batch): Json<EnhancedActionsBatch>,
) -> Json<IngestSummary> {
    let mut summary = IngestSummary::default();
    for item in batch.actions {
        state.app.capture.append_action(item.action, item.is_password_field);
        summary.accepted += 1;
    }
    Json(summary)
}

/// `GET /enhanced-actions`.
pub async fn read_actions(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<EnhancedActionsQuery>,
) -> Json<Vec<gasoline_types::EnhancedAction>> {
    Json(state.app.capture.query_actions(query.limit))
}

/// `POST /performance` — a single snapshot per call.
pub async fn ingest_performance(
    State(state): State<Arc<HttpState>>,
    Json(snapshot): Json<gasoline_types::PerformanceSnapshot>,
) -> Json<serde_json::Value> {
    state.app.capture.record_performance(snapshot);
    Json(serde_json::json!({ "accepted": true }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceQuery {
    url: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    latest: Option<gasoline_types::PerformanceSnapshot>,
    baseline: Option<gasoline_types::PerformanceBaseline>,
    snapshots: Vec<gasoline_types::PerformanceSnapshot>,
}

/// `GET /performance` — latest snapshot, running baseline for `url` (if
/// given), and a bounded history slice.
pub async fn read_performance(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<PerformanceQuery>,
) -> Json<PerformanceResponse> {
    let baseline = query.url.as_deref().and_then(|url| state.app.capture.performance_baseline(url));
    Json(PerformanceResponse {
        latest: state.app.capture.performance_latest(),
        baseline,
        snapshots: state.app.capture.performance_snapshots(query.limit),
    })
}
