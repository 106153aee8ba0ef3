//! Optional shared-secret header check (`--api-key`, spec.md §6). A no-op
//! middleware when no key is configured.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use gasoline_core::{ErrorKind, GasolineError};

use crate::error::ApiError;
use crate::HttpState;

const API_KEY_HEADER: &str = "x-gasoline-key";

pub async fn check_api_key(
    State(state): State<Arc<HttpState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = &state.api_key {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError(GasolineError::new(
                ErrorKind::Gated,
                "missing or invalid X-Gasoline-Key header",
            )));
        }
    }
    Ok(next.run(request).await)
}
