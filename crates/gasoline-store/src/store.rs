use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use gasoline_core::error::{ErrorKind, GasolineError, GasolineResult};
use gasoline_core::tab::TrackedTabState;
use gasoline_types::{
    Checkpoint, EnhancedAction, EntryKind, NetworkBody, PerformanceSnapshot, TelemetryEntry,
    WebSocketEvent,
};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;

use crate::dedup;
use crate::fanout::IngestEvent;
use crate::filter::QueryFilter;
use crate::memory::{MemoryState, MemoryStateCell};
use crate::performance::PerformanceStore;
use crate::ring::RingBuffer;

const ENTRY_RING_CAP_COUNT: usize = 1000;
const ENTRY_RING_CAP_BYTES: usize = 10 * 1024 * 1024;
const WS_RING_CAP_COUNT: usize = 500;
const WS_RING_CAP_BYTES: usize = 4 * 1024 * 1024;
const NETWORK_BODY_CAP_COUNT: usize = 100;
const NETWORK_BODY_CAP_BYTES: usize = 8 * 1024 * 1024;
const ACTIONS_CAP_COUNT: usize = 50;
const ACTIONS_CAP_BYTES: usize = 1024 * 1024;
/// Hard per-entry size cap, independent of ring budgets.
const MAX_ENTRY_BYTES: usize = 1024 * 1024;
const FANOUT_CAPACITY: usize = 1024;

/// What happened to an appended telemetry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    Merged,
    DroppedWrongTab,
}

struct EntryRings {
    console: Mutex<RingBuffer<TelemetryEntry>>,
    exception: Mutex<RingBuffer<TelemetryEntry>>,
    network: Mutex<RingBuffer<TelemetryEntry>>,
}

impl EntryRings {
    fn new() -> Self {
        Self {
            console: Mutex::new(RingBuffer::new(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES)),
            exception: Mutex::new(RingBuffer::new(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES)),
            network: Mutex::new(RingBuffer::new(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES)),
        }
    }

    fn ring(&self, kind: EntryKind) -> &Mutex<RingBuffer<TelemetryEntry>> {
        match kind {
            EntryKind::Console => &self.console,
            EntryKind::Exception => &self.exception,
            EntryKind::Network => &self.network,
        }
    }
}

/// The exclusive owner of every ring buffer. Analyzers never mutate store
/// state directly; they subscribe to the fan-out channel and keep their own
/// copies (spec.md §3 Ownership).
pub struct CaptureStore {
    tracked_tab: Arc<TrackedTabState>,
    entries: EntryRings,
    websocket: Mutex<RingBuffer<WebSocketEvent>>,
    network_bodies: Mutex<RingBuffer<NetworkBody>>,
    actions: Mutex<RingBuffer<EnhancedAction>>,
    performance: Mutex<PerformanceStore>,
    checkpoints: Mutex<HashMap<String, Checkpoint>>,

    seq_console: AtomicU64,
    seq_exception: AtomicU64,
    seq_network: AtomicU64,
    seq_websocket: AtomicU64,

    dropped_wrong_tab: AtomicU64,
    memory_state: MemoryStateCell,
    network_body_capture_enabled: AtomicBool,

    fanout: broadcast::Sender<IngestEvent>,
}

impl CaptureStore {
    pub fn new(tracked_tab: Arc<TrackedTabState>) -> Self {
        let (fanout, _rx) = broadcast::channel(FANOUT_CAPACITY);
        Self {
            tracked_tab,
            entries: EntryRings::new(),
            websocket: Mutex::new(RingBuffer::new(WS_RING_CAP_COUNT, WS_RING_CAP_BYTES)),
            network_bodies: Mutex::new(RingBuffer::new(
                NETWORK_BODY_CAP_COUNT,
                NETWORK_BODY_CAP_BYTES,
            )),
            actions: Mutex::new(RingBuffer::new(ACTIONS_CAP_COUNT, ACTIONS_CAP_BYTES)),
            performance: Mutex::new(PerformanceStore::new()),
            checkpoints: Mutex::new(HashMap::new()),
            seq_console: AtomicU64::new(0),
            seq_exception: AtomicU64::new(0),
            seq_network: AtomicU64::new(0),
            seq_websocket: AtomicU64::new(0),
            dropped_wrong_tab: AtomicU64::new(0),
            memory_state: MemoryStateCell::new(),
            network_body_capture_enabled: AtomicBool::new(true),
            fanout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.fanout.subscribe()
    }

    fn next_seq(&self, kind: EntryKind) -> u64 {
        let counter = match kind {
            EntryKind::Console => &self.seq_console,
            EntryKind::Exception => &self.seq_exception,
            EntryKind::Network => &self.seq_network,
        };
        counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Append a console/exception/network-error entry (spec.md §4.1 `Append`).
    pub fn append_entry(
        &self,
        mut entry: TelemetryEntry,
    ) -> GasolineResult<AppendOutcome> {
        if !self.tracked_tab.accepts(entry.tab_id) {
            self.dropped_wrong_tab.fetch_add(1, Ordering::Relaxed);
            return Ok(AppendOutcome::DroppedWrongTab);
        }
        if entry.estimated_bytes() > MAX_ENTRY_BYTES {
            return Err(GasolineError::new(
                ErrorKind::PayloadTooLarge,
                "telemetry entry exceeds 1 MiB",
            ));
        }
        if self.memory_state.get() == MemoryState::Hard {
            return Err(GasolineError::new(
                ErrorKind::MemoryLimitExceeded,
                "capture store at hard memory limit",
            ));
        }

        entry.sequence = self.next_seq(entry.kind);
        entry.first_seen = entry.timestamp;
        entry.last_seen = entry.timestamp;
        entry.aggregated_count = 1;

        let is_error = matches!(entry.level, gasoline_types::Level::Error);
        let mut ring = self.entries.ring(entry.kind).lock();

        if is_error {
            if let Some(existing) = ring.find_mut(|candidate| dedup::should_merge(candidate, &entry)) {
                dedup::merge(existing, &entry);
                let merged = existing.clone();
                drop(ring);
                let _ = self.fanout.send(IngestEvent::Telemetry(merged));
                return Ok(AppendOutcome::Merged);
            }
        }

        let sent = entry.clone();
        ring.push(entry);
        drop(ring);
        let _ = self.fanout.send(IngestEvent::Telemetry(sent));
        Ok(AppendOutcome::Stored)
    }

    pub fn append_websocket(&self, mut event: WebSocketEvent) -> GasolineResult<()> {
        if self.memory_state.get() == MemoryState::Hard {
            return Err(GasolineError::new(
                ErrorKind::MemoryLimitExceeded,
                "capture store at hard memory limit",
            ));
        }
        event.sanitize();
        self.seq_websocket.fetch_add(1, Ordering::Relaxed);
        let sent = event.clone();
        self.websocket.lock().push(event);
        let _ = self.fanout.send(IngestEvent::WebSocket(sent));
        Ok(())
    }

    pub fn append_network_body(&self, mut body: NetworkBody) -> GasolineResult<()> {
        if !self.tracked_tab.accepts(body.tab_id) {
            self.dropped_wrong_tab.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        if !self
            .network_body_capture_enabled
            .load(Ordering::Relaxed)
        {
            return Err(GasolineError::new(
                ErrorKind::MemoryLimitExceeded,
                "network body capture disabled under memory pressure",
            ));
        }
        if self.memory_state.get() == MemoryState::Hard {
            return Err(GasolineError::new(
                ErrorKind::MemoryLimitExceeded,
                "capture store at hard memory limit",
            ));
        }
        body.sanitize();
        let sent = body.clone();
        self.network_bodies.lock().push(body);
        let _ = self.fanout.send(IngestEvent::Network(sent));
        Ok(())
    }

    pub fn append_action(&self, mut action: EnhancedAction, is_password_field: bool) {
        action.redact_if_password(is_password_field);
        self.actions.lock().push(action);
    }

    pub fn record_performance(&self, snapshot: PerformanceSnapshot) {
        self.performance.lock().record(snapshot);
    }

    pub fn performance_baseline(&self, url: &str) -> Option<gasoline_types::PerformanceBaseline> {
        self.performance.lock().baseline(url).cloned()
    }

    pub fn performance_latest(&self) -> Option<PerformanceSnapshot> {
        self.performance.lock().latest().cloned()
    }

    pub fn performance_snapshots(&self, limit: Option<usize>) -> Vec<PerformanceSnapshot> {
        let store = self.performance.lock();
        let items: Vec<_> = store.snapshots().cloned().collect();
        QueryFilter {
            limit,
            ..Default::default()
        }
        .apply_limit(items)
    }

    pub fn query_console(&self, kind: EntryKind, filter: &QueryFilter) -> Vec<TelemetryEntry> {
        let ring = self.entries.ring(kind).lock();
        let items: Vec<_> = ring
            .iter()
            .filter(|e| filter.matches_url(e.url.as_deref().unwrap_or_default()))
            .cloned()
            .collect();
        filter.apply_limit(items)
    }

    pub fn query_websocket(&self, filter: &QueryFilter) -> Vec<WebSocketEvent> {
        let ring = self.websocket.lock();
        let items: Vec<_> = ring
            .iter()
            .filter(|e| filter.matches_url(&e.url) && filter.matches_direction(e.direction))
            .cloned()
            .collect();
        filter.apply_limit(items)
    }

    pub fn query_network_bodies(&self, filter: &QueryFilter) -> Vec<NetworkBody> {
        let ring = self.network_bodies.lock();
        let items: Vec<_> = ring
            .iter()
            .filter(|b| {
                filter.matches_url(&b.url)
                    && filter.matches_method(&b.method)
                    && filter.matches_status(b.status)
            })
            .cloned()
            .collect();
        filter.apply_limit(items)
    }

    pub fn query_actions(&self, limit: Option<usize>) -> Vec<EnhancedAction> {
        let ring = self.actions.lock();
        let items: Vec<_> = ring.iter().cloned().collect();
        QueryFilter {
            limit,
            ..Default::default()
        }
        .apply_limit(items)
    }

    pub fn clear_entries(&self, kind: EntryKind) {
        self.entries.ring(kind).lock().clear();
    }

    pub fn clear_websocket(&self) {
        self.websocket.lock().clear();
    }

    pub fn clear_network_bodies(&self) {
        self.network_bodies.lock().clear();
    }

    pub fn dropped_wrong_tab(&self) -> u64 {
        self.dropped_wrong_tab.load(Ordering::Relaxed)
    }

    /// Cheap estimate used by the 30 s memory alarm: sums each ring's
    /// tracked `bytes_used` rather than walking entries.
    pub fn estimated_memory_bytes(&self) -> usize {
        self.entries.console.lock().bytes_used()
            + self.entries.exception.lock().bytes_used()
            + self.entries.network.lock().bytes_used()
            + self.websocket.lock().bytes_used()
            + self.network_bodies.lock().bytes_used()
            + self.actions.lock().bytes_used()
            + self.performance.lock().bytes_used()
    }

    pub fn memory_state(&self) -> MemoryState {
        self.memory_state.get()
    }

    /// Recompute memory pressure and apply the soft/hard transition side
    /// effects. Called by the alarms scheduler every 30 s.
    pub fn enforce_memory_pressure(&self) -> MemoryState {
        let total = self.estimated_memory_bytes();
        let new_state = MemoryStateCell::classify(total);
        let old_state = self.memory_state.get();
        if new_state != old_state {
            match new_state {
                MemoryState::Soft => {
                    self.entries.console.lock().halve_caps();
                    self.entries.exception.lock().halve_caps();
                    self.entries.network.lock().halve_caps();
                    self.websocket.lock().halve_caps();
                    self.network_bodies.lock().halve_caps();
                    self.network_body_capture_enabled
                        .store(false, Ordering::Relaxed);
                }
                MemoryState::Normal => {
                    self.entries
                        .console
                        .lock()
                        .restore_caps(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES);
                    self.entries
                        .exception
                        .lock()
                        .restore_caps(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES);
                    self.entries
                        .network
                        .lock()
                        .restore_caps(ENTRY_RING_CAP_COUNT, ENTRY_RING_CAP_BYTES);
                    self.websocket
                        .lock()
                        .restore_caps(WS_RING_CAP_COUNT, WS_RING_CAP_BYTES);
                    self.network_bodies
                        .lock()
                        .restore_caps(NETWORK_BODY_CAP_COUNT, NETWORK_BODY_CAP_BYTES);
                    self.network_body_capture_enabled
                        .store(true, Ordering::Relaxed);
                }
                MemoryState::Hard => {}
            }
            self.memory_state.set(new_state);
        }
        new_state
    }

    /// Snapshot counts + content digests for `configure { action: "store" }`
    /// style checkpointing, i.e. `analyze { target: "changes" }`.
    pub fn checkpoint(&self, name: Option<String>) -> Checkpoint {
        let mut counts = HashMap::new();
        let mut digests = HashMap::new();

        for (label, entries) in [
            ("console", self.entries.console.lock()),
            ("exception", self.entries.exception.lock()),
            ("network", self.entries.network.lock()),
        ] {
            counts.insert(label.to_string(), entries.len());
            digests.insert(label.to_string(), digest_entries(entries.iter()));
        }
        counts.insert("websocket".to_string(), self.websocket.lock().len());
        counts.insert(
            "network_bodies".to_string(),
            self.network_bodies.lock().len(),
        );

        let checkpoint = Checkpoint {
            name: name.clone(),
            timestamp: Utc::now(),
            counts,
            digests,
        };
        let key = name.unwrap_or_else(|| "default".to_string());
        self.checkpoints.lock().insert(key, checkpoint.clone());
        checkpoint
    }

    /// Entries appended (by signature) since `checkpoint_name` was recorded.
    pub fn diff_since(&self, checkpoint_name: &str) -> GasolineResult<Vec<TelemetryEntry>> {
        let checkpoints = self.checkpoints.lock();
        let checkpoint = checkpoints.get(checkpoint_name).ok_or_else(|| {
            GasolineError::new(ErrorKind::InvalidParameter, "unknown checkpoint")
                .with_field("checkpointName")
        })?;
        let known: std::collections::HashSet<String> = checkpoint
            .digests
            .values()
            .flat_map(|d| d.split(',').map(str::to_string))
            .collect();
        drop(checkpoints);

        let mut out = Vec::new();
        for ring in [
            self.entries.console.lock(),
            self.entries.exception.lock(),
            self.entries.network.lock(),
        ] {
            for entry in ring.iter() {
                let sig = entry.dedup_signature();
                if !known.contains(&sig) {
                    out.push(entry.clone());
                }
            }
        }
        Ok(out)
    }
}

fn digest_entries<'a>(entries: impl Iterator<Item = &'a TelemetryEntry>) -> String {
    let sigs: Vec<String> = entries.map(|e| e.dedup_signature()).collect();
    let joined = sigs.join(",");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
        .chars()
        .take(16)
        .collect::<String>()
        + ","
        + &joined
}
