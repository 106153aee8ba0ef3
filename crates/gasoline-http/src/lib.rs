//! Loopback HTTP ingestion surface and `/mcp` transport (spec.md §4.2).
//! Binds 127.0.0.1 only; the listener and its fast-fail/bridge lifecycle
//! belong to `gasoline-cli` (spec.md §4.9) — this crate only builds the
//! [`Router`](axum::Router) and its handlers.

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use gasoline_server::{AppState, McpServer};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;

use rate_limit::RateLimiter;

/// Default request body cap (spec.md §4.2 — 2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// `/screenshot` gets a larger cap (spec.md §4.2 — 16 MiB).
pub const SCREENSHOT_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Everything the HTTP transport needs beyond the transport-agnostic
/// [`AppState`]: the MCP dispatcher, the optional shared-secret key, and the
/// per-address rate limiter.
pub struct HttpState {
    pub app: Arc<AppState>,
    pub mcp: Arc<McpServer>,
    pub api_key: Option<String>,
    pub limiter: RateLimiter,
}

impl HttpState {
    pub fn new(app: Arc<AppState>, api_key: Option<String>) -> Arc<Self> {
        let mcp = Arc::new(McpServer::new(app.clone()));
        Arc::new(Self {
            app,
            mcp,
            api_key,
            limiter: RateLimiter::new(),
        })
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.as_bytes().starts_with(b"chrome-extension://") || origin.as_bytes() == b"null"
        }))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Builds the full router: every endpoint in spec.md §4.2's table, gzip
/// acceptance, CORS for the extension origin, per-address rate limiting,
/// the optional API key gate, and body-size caps (2 MiB, 16 MiB for
/// `/screenshot`).
///
/// Serve with `axum::serve(listener,
/// app.into_make_service_with_connect_info::<SocketAddr>())` so
/// `rate_limit::enforce` can see the caller's address.
pub fn build_router(state: Arc<HttpState>) -> Router {
    let screenshot_routes = Router::new()
        .route("/screenshot", post(routes::screenshot::handle))
        .route_layer(DefaultBodyLimit::max(SCREENSHOT_BODY_BYTES));

    let main_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/sync", post(routes::health::sync))
        .route("/settings", get(routes::health::settings))
        .route("/extension-status", post(routes::health::extension_status))
        .route(
            "/logs",
            get(routes::ingest::read_logs)
                .post(routes::ingest::ingest_logs)
                .delete(routes::ingest::clear_logs),
        )
        .route(
            "/websocket-events",
            get(routes::ingest::read_websocket).post(routes::ingest::ingest_websocket),
        )
        .route(
            "/network-bodies",
            get(routes::ingest::read_network_bodies).post(routes::ingest::ingest_network_bodies),
        )
        .route(
            "/enhanced-actions",
            get(routes::ingest::read_actions).post(routes::ingest::ingest_actions),
        )
        .route(
            "/performance",
            get(routes::ingest::read_performance).post(routes::ingest::ingest_performance),
        )
        .route("/commands/poll", get(routes::commands::poll))
        .route("/commands/response", post(routes::commands::respond))
        .route("/mcp", post(routes::mcp::handle))
        .route_layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .merge(main_routes)
        .merge(screenshot_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth::check_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(cors_layer())
        .layer(CompressionLayer::new())
        .layer(RequestDecompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state() -> Arc<HttpState> {
        let dir = tempfile::tempdir().unwrap();
        let app = AppState::new(dir.path().to_path_buf(), None, HashSet::new());
        HttpState::new(app, None)
    }

    #[test]
    fn router_builds_without_panicking() {
        let _router = build_router(state());
    }
}
