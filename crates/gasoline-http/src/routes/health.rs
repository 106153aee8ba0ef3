//! `/health`, `/sync`, `/settings`, `/extension-status` — spec.md §4.2, §4.9.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::HttpState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server_version: &'static str,
    pub uptime_secs: u64,
    pub memory_state: gasoline_store::MemoryState,
    pub estimated_memory_bytes: usize,
    pub extension_connected: bool,
}

/// `GET /health` — liveness, version, and memory stats. The singleton
/// bridge (gasoline-cli) compares `server_version` against its own before
/// deciding to connect instead of binding.
pub async fn health(State(state): State<Arc<HttpState>>) -> Json<HealthResponse> {
    let app = &state.app;
    Json(HealthResponse {
        status: "ok",
        server_version: app.process.server_version(),
        uptime_secs: app.process.uptime_secs(),
        memory_state: app.capture.memory_state(),
        estimated_memory_bytes: app.capture.estimated_memory_bytes(),
        extension_connected: app.process.extension_connected(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub extension_version: String,
    #[serde(default)]
    pub expected_server_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub server_version: &'static str,
    pub extension_version_ack: String,
    /// Populated rather than a 409 when `expected_server_version` mismatches
    /// (Open Question resolution, spec.md §9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// `POST /sync` — extension handshake.
pub async fn sync(
    State(state): State<Arc<HttpState>>,
    Json(request): Json<SyncRequest>,
) -> Json<SyncResponse> {
    state.app.process.record_heartbeat();
    let server_version = state.app.process.server_version();
    let warning = request
        .expected_server_version
        .as_deref()
        .filter(|expected| *expected != server_version)
        .map(|expected| format!("extension expected server {expected}, found {server_version}"));

    Json(SyncResponse {
        server_version,
        extension_version_ack: request.extension_version,
        warning,
    })
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: gasoline_core::CaptureSettings,
    pub connected: bool,
    pub tracked_tab: Option<gasoline_types::TabId>,
}

/// `GET /settings` — current capture overrides, plus the extension
/// connectivity hint the reconnect alarm maintains.
pub async fn settings(State(state): State<Arc<HttpState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        settings: state.app.capture_settings(),
        connected: state.app.process.extension_connected(),
        tracked_tab: state.app.process.tracked_tab.current(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ExtensionStatusRequest {
    pub tab_id: gasoline_types::TabId,
    #[serde(default)]
    pub url: Option<String>,
}

/// `POST /extension-status` — extension heartbeat; records the tracked tab.
pub async fn extension_status(
    State(state): State<Arc<HttpState>>,
    Json(request): Json<ExtensionStatusRequest>,
) -> Json<serde_json::Value> {
    state.app.process.record_heartbeat();
    state.app.process.tracked_tab.track(request.tab_id, request.url);
    Json(serde_json::json!({ "acknowledged": true }))
}
