use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-request tracing context, attached to every HTTP handler and MCP tool
/// call so logs can be correlated (`request_id`, `tool`, `duration_ms`).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new(remote_addr: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            remote_addr,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
