//! Maps [`GasolineError`] onto an HTTP response: status from
//! `http_status()`, body from `as_tool_payload()`, `Retry-After` on the two
//! error kinds the ingestion surface can legitimately ask a client to back
//! off from (spec.md §7).

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gasoline_core::{ErrorKind, GasolineError};

pub struct ApiError(pub GasolineError);

impl From<GasolineError> for ApiError {
    fn from(err: GasolineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.0.as_tool_payload())).into_response();
        if matches!(self.0.kind, ErrorKind::RateLimited | ErrorKind::MemoryLimitExceeded) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// Parse a request body into `T`, mapping malformed JSON onto the same
/// `ParseError` shape ingest uses for bad telemetry (spec.md §4.1 — "Ingest
/// never panics on bad JSON; returns 400 with a field path").
pub fn parse_body<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes)
        .map_err(|err| ApiError(GasolineError::new(ErrorKind::ParseError, err.to_string())))
}
