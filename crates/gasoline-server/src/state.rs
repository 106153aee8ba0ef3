//! Process-wide server state: the capture store, every analyzer, the KV
//! store, command channel, history log, and alert queue wired into one
//! `Arc`-shared handle every tool handler and HTTP route receives.

use std::collections::HashSet;
use std::sync::Arc;

use gasoline_analysis::{ClusterStore, ContractValidator, ReputationLists, SchemaStore, ThirdPartyAuditor};
use gasoline_core::{CaptureConfig, ProcessContext};
use gasoline_kv::KvStore;
use gasoline_store::CaptureStore;
use gasoline_types::{Alert, AlertSeverity};
use parking_lot::Mutex;

use crate::commands::CommandChannel;
use crate::history::HistoryLog;

const ALERT_QUEUE_CAP: usize = 200;

/// Pending analyzer-raised alerts, drained into `observe` responses.
#[derive(Default)]
pub struct AlertQueue {
    pending: Mutex<std::collections::VecDeque<Alert>>,
}

impl AlertQueue {
    pub fn push(&self, alert: Alert) {
        let mut guard = self.pending.lock();
        guard.push_back(alert);
        if guard.len() > ALERT_QUEUE_CAP {
            guard.pop_front();
        }
    }

    /// Raise an internal alarm-failure alert (spec.md §7's "repeated
    /// failures ... raise an Alert" rule).
    pub fn raise(&self, category: &str, title: impl Into<String>, detail: impl Into<String>) {
        self.push(Alert::new(AlertSeverity::High, category, title, detail, "gasoline-server::alarms"));
    }

    /// Drain every pending alert, returning them in arrival order.
    pub fn drain(&self) -> Vec<Alert> {
        self.pending.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Last cached accessibility (axe-core) audit result, supplied by the
/// extension as a `TelemetryEntry` enrichment and surfaced by
/// `analyze { target: "accessibility" }`.
#[derive(Default)]
pub struct AccessibilityCache {
    latest: Mutex<Option<serde_json::Value>>,
}

impl AccessibilityCache {
    pub fn set(&self, result: serde_json::Value) {
        *self.latest.lock() = Some(result);
    }

    pub fn get(&self) -> Option<serde_json::Value> {
        self.latest.lock().clone()
    }
}

/// Everything one gasoline daemon process shares across HTTP handlers,
/// MCP tool calls, and alarm tasks. Built once at startup.
pub struct AppState {
    pub process: ProcessContext,
    pub capture: Arc<CaptureStore>,
    pub clusters: Mutex<ClusterStore>,
    pub schema: Mutex<SchemaStore>,
    pub contract: Mutex<ContractValidator>,
    pub third_party: ThirdPartyAuditor,
    pub kv: Arc<KvStore>,
    pub commands: CommandChannel,
    pub history: HistoryLog,
    pub alerts: AlertQueue,
    pub accessibility: AccessibilityCache,
    pub api_key: Option<String>,
    pub server_version: &'static str,
}

impl AppState {
    pub fn new(kv_root: std::path::PathBuf, api_key: Option<String>, first_party: HashSet<String>) -> Arc<Self> {
        let process = ProcessContext::new(env!("CARGO_PKG_VERSION"));
        Arc::new(Self {
            capture: Arc::new(CaptureStore::new(process.tracked_tab.clone())),
            process,
            clusters: Mutex::new(ClusterStore::new()),
            schema: Mutex::new(SchemaStore::new()),
            contract: Mutex::new(ContractValidator::new()),
            third_party: ThirdPartyAuditor::new(first_party, ReputationLists::default()),
            kv: KvStore::new(kv_root),
            commands: CommandChannel::new(),
            history: HistoryLog::new(),
            alerts: AlertQueue::default(),
            accessibility: AccessibilityCache::default(),
            api_key,
            server_version: env!("CARGO_PKG_VERSION"),
        })
    }

    pub fn capture_settings(&self) -> gasoline_core::CaptureSettings {
        self.process.capture.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_queue_caps_and_drains_fifo() {
        let queue = AlertQueue::default();
        for i in 0..(ALERT_QUEUE_CAP + 10) {
            queue.push(Alert::new(AlertSeverity::Low, "t", format!("{i}"), "d", "s"));
        }
        assert_eq!(queue.len(), ALERT_QUEUE_CAP);
        let drained = queue.drain();
        assert_eq!(drained.len(), ALERT_QUEUE_CAP);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn new_state_has_empty_stores() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path().to_path_buf(), None, HashSet::new());
        assert_eq!(state.clusters.lock().len(), 0);
        assert_eq!(state.schema.lock().len(), 0);
    }
}
