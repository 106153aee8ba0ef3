use chrono::Duration;
use gasoline_types::TelemetryEntry;

/// Window within which two console errors with the same dedup signature
/// merge into one entry instead of appending a second.
pub const DEDUP_WINDOW: Duration = Duration::seconds(5);

/// True when `incoming` should be merged into `existing` rather than stored
/// as a new entry.
pub fn should_merge(existing: &TelemetryEntry, incoming: &TelemetryEntry) -> bool {
    existing.dedup_signature() == incoming.dedup_signature()
        && (incoming.timestamp - existing.last_seen) <= DEDUP_WINDOW
        && (incoming.timestamp - existing.last_seen) >= Duration::zero()
}

/// Merge `incoming` into `existing` in place, keeping the Open-Question
/// resolution recorded in DESIGN.md: the *first* instance's payload wins,
/// only the counters and `_lastSeen` advance.
pub fn merge(existing: &mut TelemetryEntry, incoming: &TelemetryEntry) {
    existing.aggregated_count += 1;
    existing.last_seen = incoming.timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gasoline_types::{EntryKind, Level};

    fn entry(message: &str, ts_offset_secs: i64) -> TelemetryEntry {
        let now = Utc::now();
        TelemetryEntry {
            sequence: 0,
            timestamp: now + Duration::seconds(ts_offset_secs),
            tab_id: 1,
            level: Level::Error,
            kind: EntryKind::Console,
            message: message.to_string(),
            args: vec![],
            stack: None,
            url: None,
            method: None,
            status: None,
            actions: None,
            ai_context: None,
            enrichments: vec![],
            aggregated_count: 1,
            first_seen: now,
            last_seen: now + Duration::seconds(ts_offset_secs),
        }
    }

    #[test]
    fn merges_within_window() {
        let first = entry("boom", 0);
        let second = entry("boom", 1);
        assert!(should_merge(&first, &second));
    }

    #[test]
    fn does_not_merge_after_window() {
        let first = entry("boom", 0);
        let second = entry("boom", 6);
        assert!(!should_merge(&first, &second));
    }

    #[test]
    fn does_not_merge_different_messages() {
        let first = entry("boom", 0);
        let second = entry("crash", 1);
        assert!(!should_merge(&first, &second));
    }
}
