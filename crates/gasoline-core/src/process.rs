use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::CaptureConfig;
use crate::tab::TrackedTabState;

/// Single process-wide context object, initialized once at startup.
/// Components take a shared, read-mostly handle; only specific mutators
/// (tab tracking, capture config, heartbeat) advance state under their own
/// locks (design note, spec.md §9 — "Global state ... a single Process
/// context object").
#[derive(Clone)]
pub struct ProcessContext {
    pub tracked_tab: Arc<TrackedTabState>,
    pub capture: Arc<CaptureConfig>,
    pub started_at: Instant,
    server_version: &'static str,
    last_extension_heartbeat: Arc<Mutex<Option<Instant>>>,
}

impl ProcessContext {
    pub fn new(server_version: &'static str) -> Self {
        Self {
            tracked_tab: Arc::new(TrackedTabState::new()),
            capture: Arc::new(CaptureConfig::new()),
            started_at: Instant::now(),
            server_version,
            last_extension_heartbeat: Arc::new(Mutex::new(None)),
        }
    }

    pub fn server_version(&self) -> &'static str {
        self.server_version
    }

    pub fn record_heartbeat(&self) {
        *self.last_extension_heartbeat.lock() = Some(Instant::now());
    }

    /// Used by the "extension reconnect hint" alarm (spec.md §4.10): marks
    /// the extension disconnected when no heartbeat arrived within 60s.
    pub fn extension_connected(&self) -> bool {
        match *self.last_extension_heartbeat.lock() {
            Some(last) => last.elapsed().as_secs() < 60,
            None => false,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
