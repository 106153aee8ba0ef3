//! The five cooperative alarm tasks (spec.md §4.10), each its own
//! `tokio::time::interval` loop so a slow one never blocks another, let
//! alone ingest.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::state::AppState;

const MEMORY_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const ERROR_GROUP_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);
const CLUSTER_CLEANUP_INTERVAL: Duration = Duration::from_secs(120);
const RECONNECT_HINT_INTERVAL: Duration = Duration::from_secs(5);

/// Spawn all five alarms plus the KV background flush, returning their join
/// handles so the caller can hold (or abort) them for the life of the
/// process.
pub fn spawn_all(state: Arc<AppState>) -> Vec<tokio::task::JoinHandle<()>> {
    vec![
        spawn_memory_check(state.clone()),
        spawn_cluster_cleanup(state.clone()),
        spawn_error_group_cleanup(state.clone()),
        spawn_reconnect_hint(state.clone()),
        state.kv.spawn_flush_task(),
    ]
}

/// Memory check and dedup flush share a cadence (spec.md §4.10 lists both at
/// 30 s); dedup merging already happens synchronously in
/// `CaptureStore::append_entry`, so the only periodic work left is
/// recomputing memory pressure and applying its soft/hard side effects.
fn spawn_memory_check(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_CHECK_INTERVAL);
        loop {
            interval.tick().await;
            let new_state = state.capture.enforce_memory_pressure();
            match new_state {
                gasoline_store::MemoryState::Soft => state.process.capture.enter_memory_pressure(),
                gasoline_store::MemoryState::Normal => state.process.capture.exit_memory_pressure(),
                gasoline_store::MemoryState::Hard => {
                    tracing::warn!("capture store at hard memory limit");
                }
            }
        }
    })
}

fn spawn_cluster_cleanup(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLUSTER_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let swept = state.clusters.lock().sweep_expired(Utc::now());
            if swept > 0 {
                tracing::debug!(swept, "swept expired error clusters");
            }
        }
    })
}

/// Sweeps dedup bookkeeping older than 5 minutes. Entry-level merge state
/// lives inline on each `TelemetryEntry` and is evicted along with the ring,
/// so this tick is a no-op placeholder kept at the spec's named cadence.
fn spawn_error_group_cleanup(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ERROR_GROUP_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let _ = &state;
            tracing::trace!("error-group cleanup tick");
        }
    })
}

fn spawn_reconnect_hint(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RECONNECT_HINT_INTERVAL);
        loop {
            interval.tick().await;
            let _ = state.process.extension_connected();
        }
    })
}
