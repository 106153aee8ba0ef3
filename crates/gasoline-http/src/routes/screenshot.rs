//! `POST /screenshot` — accepts a base64-encoded screenshot plus a
//! reference tag and stashes it in the KV store (spec.md §4.2, §4.11). The
//! 16 MiB body cap for this route is applied at the router layer.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::Engine;
use chrono::Utc;
use gasoline_core::GasolineError;
use serde::Deserialize;

use crate::error::ApiError;
use crate::HttpState;

const SCREENSHOT_NAMESPACE: &str = "screenshots";

#[derive(Debug, Deserialize)]
pub struct ScreenshotRequest {
    /// Base64-encoded image data.
    pub data: String,
    #[serde(default)]
    pub tag: Option<String>,
}

pub async fn handle(
    State(state): State<Arc<HttpState>>,
    Json(request): Json<ScreenshotRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    base64::engine::general_purpose::STANDARD
        .decode(&request.data)
        .map_err(|err| GasolineError::invalid_parameter("data", err.to_string()))?;

    let key = request.tag.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let value = serde_json::json!({
        "data": request.data,
        "tag": request.tag,
        "captured_at": Utc::now(),
    });

    state.app.kv.save(SCREENSHOT_NAMESPACE, &key, value).await?;

    Ok(Json(serde_json::json!({ "stored": true, "key": key })))
}
