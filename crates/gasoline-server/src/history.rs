//! Temporal event graph queried by `analyze { target: "history" }`: manual
//! markers recorded via `configure { action: "record_event" }` plus
//! automatic markers the server itself appends (deploys, checkpoints).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

const HISTORY_CAP: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_to: Option<String>,
}

/// Bounded FIFO log of [`HistoryEvent`]s, queryable by time range, type, and
/// a free-text pattern over `description`.
#[derive(Default)]
pub struct HistoryLog {
    events: Mutex<std::collections::VecDeque<HistoryEvent>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: HistoryEvent) {
        let mut guard = self.events.lock();
        guard.push_back(event);
        if guard.len() > HISTORY_CAP {
            guard.pop_front();
        }
    }

    pub fn query(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        kind: Option<&str>,
        pattern: Option<&str>,
        related_to: Option<&str>,
    ) -> Vec<HistoryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| since.is_none_or(|s| e.timestamp >= s))
            .filter(|e| until.is_none_or(|u| e.timestamp <= u))
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .filter(|e| pattern.is_none_or(|p| e.description.contains(p)))
            .filter(|e| related_to.is_none_or(|r| e.related_to.as_deref() == Some(r)))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, description: &str) -> HistoryEvent {
        HistoryEvent {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            description: description.to_string(),
            origin: "agent".to_string(),
            related_to: None,
        }
    }

    #[test]
    fn query_filters_by_type_and_pattern() {
        let log = HistoryLog::new();
        log.record(event("deploy", "shipped v2"));
        log.record(event("note", "investigating checkout bug"));

        let deploys = log.query(None, None, Some("deploy"), None, None);
        assert_eq!(deploys.len(), 1);

        let matching = log.query(None, None, None, Some("checkout"), None);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].kind, "note");
    }

    #[test]
    fn caps_at_500_fifo() {
        let log = HistoryLog::new();
        for i in 0..600 {
            log.record(event("note", &format!("event {i}")));
        }
        assert_eq!(log.len(), HISTORY_CAP);
    }
}
