//! Per-address token-bucket rate limiting for the HTTP ingestion surface
//! (spec.md §4.2 — 100 req/s, 429 + `Retry-After` when exceeded). A classic
//! refill-on-access token bucket, keyed here by remote address instead of
//! an MCP client id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use gasoline_core::{ErrorKind, GasolineError};
use parking_lot::Mutex;

use crate::error::ApiError;
use crate::HttpState;

const MAX_REQUESTS_PER_SEC: f64 = 100.0;
const REFILL_GRANULARITY: Duration = Duration::from_millis(10);
const STALE_AFTER: Duration = Duration::from_secs(300);
const CLEANUP_EVERY: Duration = Duration::from_secs(60);

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_access: Instant,
}

impl TokenBucket {
    fn new() -> Self {
        Self {
            tokens: MAX_REQUESTS_PER_SEC,
            last_refill: Instant::now(),
            last_access: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if elapsed >= REFILL_GRANULARITY {
            self.tokens = (self.tokens + elapsed.as_secs_f64() * MAX_REQUESTS_PER_SEC)
                .min(MAX_REQUESTS_PER_SEC);
            self.last_refill = now;
        }
        self.last_access = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One bucket per remote address. Idle buckets are swept on a 60 s cadence.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    last_cleanup: Mutex<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    /// `true` if `client_id` (the remote address) may proceed.
    pub fn check(&self, client_id: &str) -> bool {
        if self.last_cleanup.lock().elapsed() > CLEANUP_EVERY {
            self.cleanup();
            *self.last_cleanup.lock() = Instant::now();
        }
        self.buckets
            .lock()
            .entry(client_id.to_string())
            .or_insert_with(TokenBucket::new)
            .try_acquire()
    }

    fn cleanup(&self) {
        let now = Instant::now();
        self.buckets
            .lock()
            .retain(|_, bucket| now.duration_since(bucket.last_access) < STALE_AFTER);
    }

    pub fn tracked_addresses(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// `axum::middleware::from_fn_with_state` hook: 429 + `Retry-After` once the
/// caller's address exhausts its bucket. Requires the router to be served
/// with `into_make_service_with_connect_info::<SocketAddr>()` so
/// `ConnectInfo` is available.
pub async fn enforce(
    State(state): State<Arc<HttpState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.limiter.check(&addr.ip().to_string()) {
        return Err(ApiError(GasolineError::new(
            ErrorKind::RateLimited,
            "rate limit exceeded: 100 requests/second per address",
        )));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_then_recovers_nothing_within_the_same_instant() {
        let limiter = RateLimiter::new();
        for _ in 0..100 {
            assert!(limiter.check("1.2.3.4"));
        }
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn buckets_are_independent_per_address() {
        let limiter = RateLimiter::new();
        for _ in 0..100 {
            assert!(limiter.check("1.2.3.4"));
        }
        assert!(limiter.check("5.6.7.8"));
        assert_eq!(limiter.tracked_addresses(), 2);
    }
}
