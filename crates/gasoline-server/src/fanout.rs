//! Drives the analyzers off the capture store's broadcast channel. One task,
//! subscribed once at startup; a slow consumer here only means `Lagged`
//! errors (dropped-oldest), never back-pressure on ingest (spec.md §5).

use std::sync::Arc;

use gasoline_analysis::schema::SchemaStore;
use gasoline_store::IngestEvent;
use gasoline_types::{EntryKind, Level};
use tokio::sync::broadcast;

use crate::state::AppState;

pub fn spawn_fanout_task(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let mut receiver = state.capture.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => handle_event(&state, event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "analyzer fan-out lagged, dropped oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn handle_event(state: &AppState, event: IngestEvent) {
    match event {
        IngestEvent::Telemetry(entry) => {
            if matches!(entry.level, Level::Error) && matches!(entry.kind, EntryKind::Console | EntryKind::Exception) {
                if let Some(alert) = state.clusters.lock().ingest(&entry) {
                    state.alerts.push(alert);
                }
            }
            if let Some(enrichment) = entry.enrichments.iter().find(|e| e.key == "accessibility_audit") {
                state.accessibility.set(enrichment.data.clone());
            }
        }
        IngestEvent::Network(body) => {
            let (path, _) = path_of(&body.url);
            let normalized = gasoline_analysis::schema::normalize_path(&path);
            let key = SchemaStore::endpoint_key(&body.method, &normalized);
            state.schema.lock().observe(&body);
            state.contract.lock().observe(&key, &body);
        }
        IngestEvent::WebSocket(_) => {}
    }
}

fn path_of(url: &str) -> (String, ()) {
    match url.split_once('?') {
        Some((path, _)) => (path.to_string(), ()),
        None => (url.to_string(), ()),
    }
}
