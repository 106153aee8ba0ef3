use gasoline_types::{NetworkBody, TelemetryEntry, WebSocketEvent};

/// What gets broadcast to analyzers on every successful ingest. Analyzers
/// subscribe via [`super::CaptureStore::subscribe`]; a `broadcast` channel
/// is used deliberately — a slow analyzer lags and silently drops the
/// oldest backlog instead of ever back-pressuring ingest (spec.md §5).
#[derive(Debug, Clone)]
pub enum IngestEvent {
    Telemetry(TelemetryEntry),
    Network(NetworkBody),
    WebSocket(WebSocketEvent),
}
