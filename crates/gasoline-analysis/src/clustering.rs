//! 2-of-3 signal error clustering over the console/exception telemetry
//! stream. A small in-process analyzer, not a general-purpose classifier:
//! it keeps its own bounded state and never touches the capture store.

use std::collections::VecDeque;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use gasoline_types::{Alert, AlertSeverity, TelemetryEntry};
use regex::Regex;
use serde::Serialize;

/// Hard cap on tracked clusters; oldest evicted on overflow.
const CLUSTER_CAP: usize = 50;
/// Hard cap on instances recorded per cluster; counter keeps climbing past it.
const CLUSTER_INSTANCE_CAP: usize = 20;
/// Clusters inactive this long are swept by the cleanup alarm.
const CLUSTER_EXPIRY: Duration = Duration::minutes(5);
/// Two errors within this window count as temporally correlated.
const TEMPORAL_WINDOW: Duration = Duration::seconds(2);
/// First time a cluster crosses this many instances it raises an alert.
const ALERT_INSTANCE_THRESHOLD: u32 = 3;

fn framework_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"node_modules/react|vue|angular|svelte|rxjs|core-js|webpack/bootstrap|webpack/runtime|zone\.js").unwrap()
    })
}

fn uuid_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
    })
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn timestamp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?").unwrap()
    })
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{3,}").unwrap())
}

/// Replace UUIDs, URLs, ISO timestamps, and 3+ digit numbers with stable
/// placeholders so unrelated instances of the same error compare equal.
pub fn normalize_message(message: &str) -> String {
    let s = uuid_pattern().replace_all(message, "{uuid}");
    let s = url_pattern().replace_all(&s, "{url}");
    let s = timestamp_pattern().replace_all(&s, "{timestamp}");
    number_pattern().replace_all(&s, "{id}").into_owned()
}

/// One `file:line` frame, application-level only (framework frames are
/// filtered out before a stack ever reaches this analyzer).
fn application_frames(stack: &str) -> Vec<&str> {
    stack
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !framework_pattern().is_match(line))
        .collect()
}

#[derive(Debug, Clone)]
struct ClusterInstance {
    normalized_message: String,
    frames: Vec<String>,
    timestamp: DateTime<Utc>,
    raw_message: String,
}

/// A group of errors believed to share a root cause.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorCluster {
    pub id: String,
    pub representative_message: String,
    pub instance_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(skip)]
    instances: VecDeque<ClusterInstance>,
    #[serde(skip)]
    alerted: bool,
}

impl ErrorCluster {
    fn matches(&self, candidate: &ClusterInstance) -> bool {
        let Some(last) = self.instances.back() else {
            return false;
        };
        signal_count(last, candidate) >= 2
    }

    /// Deepest shared non-framework frame, else the normalized message.
    pub fn root_cause(&self) -> String {
        if let Some(first) = self.instances.front() {
            if let Some(frame) = first.frames.first() {
                return frame.clone();
            }
        }
        self.representative_message.clone()
    }
}

fn signal_count(a: &ClusterInstance, b: &ClusterInstance) -> u8 {
    let mut signals = 0;
    if a.normalized_message == b.normalized_message {
        signals += 1;
    }
    if !a.frames.is_empty() && !b.frames.is_empty() && a.frames.iter().any(|f| b.frames.contains(f))
    {
        signals += 1;
    }
    if (b.timestamp - a.timestamp).abs() <= TEMPORAL_WINDOW {
        signals += 1;
    }
    signals
}

/// Tracks clusters plus a small unclustered working set, matching spec.md
/// §4.5's "compare against unclustered set" rule.
#[derive(Debug, Default)]
pub struct ClusterStore {
    clusters: VecDeque<ErrorCluster>,
    unclustered: VecDeque<ClusterInstance>,
    next_id: u64,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ErrorCluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Errors seen but not yet correlated into a cluster.
    pub fn unclustered_count(&self) -> usize {
        self.unclustered.len()
    }

    /// Ingest a new error instance. Returns an [`Alert`] the first time the
    /// resulting cluster crosses the instance threshold.
    pub fn ingest(&mut self, entry: &TelemetryEntry) -> Option<Alert> {
        let candidate = ClusterInstance {
            normalized_message: normalize_message(&entry.message),
            frames: entry
                .stack
                .as_deref()
                .map(|s| application_frames(s).into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
            timestamp: entry.timestamp,
            raw_message: entry.message.clone(),
        };

        if let Some(idx) = self.clusters.iter().position(|c| c.matches(&candidate)) {
            let cluster = &mut self.clusters[idx];
            cluster.instance_count += 1;
            cluster.last_seen = candidate.timestamp;
            if cluster.instances.len() < CLUSTER_INSTANCE_CAP {
                cluster.instances.push_back(candidate);
            }
            let crossed = !cluster.alerted && cluster.instance_count >= ALERT_INSTANCE_THRESHOLD;
            if crossed {
                cluster.alerted = true;
                let message = cluster.representative_message.clone();
                return Some(Alert::new(
                    AlertSeverity::Medium,
                    "error_cluster",
                    format!("recurring error: {message}"),
                    format!("reached {ALERT_INSTANCE_THRESHOLD} instances"),
                    "gasoline-analysis::clustering",
                ));
            }
            return None;
        }

        if let Some(idx) = self
            .unclustered
            .iter()
            .position(|existing| should_form_cluster(existing, &candidate))
        {
            let existing = self.unclustered.remove(idx).unwrap();
            self.create_cluster(existing, candidate);
        } else {
            self.unclustered.push_back(candidate);
            if self.unclustered.len() > CLUSTER_CAP {
                self.unclustered.pop_front();
            }
        }
        None
    }

    fn create_cluster(&mut self, first: ClusterInstance, second: ClusterInstance) {
        self.next_id += 1;
        let mut instances = VecDeque::new();
        let representative_message = first.raw_message.clone();
        let first_seen = first.timestamp;
        let last_seen = second.timestamp;
        instances.push_back(first);
        instances.push_back(second);
        self.clusters.push_back(ErrorCluster {
            id: format!("cluster-{}", self.next_id),
            representative_message,
            instance_count: 2,
            first_seen,
            last_seen,
            instances,
            alerted: false,
        });
        if self.clusters.len() > CLUSTER_CAP {
            self.clusters.pop_front();
        }
    }

    /// Sweep clusters inactive longer than [`CLUSTER_EXPIRY`]. Run by the
    /// cluster-cleanup alarm every 2 minutes.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.clusters.len();
        self.clusters.retain(|c| now - c.last_seen <= CLUSTER_EXPIRY);
        before - self.clusters.len()
    }
}

fn should_form_cluster(a: &ClusterInstance, b: &ClusterInstance) -> bool {
    let signals = signal_count(a, b);
    if signals >= 2 {
        return true;
    }
    // Stackless errors with identical normalized messages cluster on
    // message alone.
    a.frames.is_empty() && b.frames.is_empty() && a.normalized_message == b.normalized_message
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasoline_types::{EntryKind, Level};

    fn entry(message: &str, stack: Option<&str>, offset_secs: i64) -> TelemetryEntry {
        let now = Utc::now();
        TelemetryEntry {
            sequence: 0,
            timestamp: now + Duration::seconds(offset_secs),
            tab_id: 1,
            level: Level::Error,
            kind: EntryKind::Console,
            message: message.to_string(),
            args: vec![],
            stack: stack.map(str::to_string),
            url: None,
            method: None,
            status: None,
            actions: None,
            ai_context: None,
            enrichments: vec![],
            aggregated_count: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    #[test]
    fn normalizes_uuids_urls_and_numbers() {
        let msg = "failed at https://api.example.com/v1/users/123456 id=550e8400-e29b-41d4-a716-446655440000";
        let normalized = normalize_message(msg);
        assert!(normalized.contains("{url}"));
        assert!(normalized.contains("{uuid}"));
        assert!(normalized.contains("{id}"));
    }

    #[test]
    fn forms_cluster_on_matching_message_and_stack() {
        let mut store = ClusterStore::new();
        let stack = "at doThing (app.js:10)\nat node_modules/react/index.js:5";
        assert!(store.ingest(&entry("boom", Some(stack), 0)).is_none());
        assert!(store.ingest(&entry("boom", Some(stack), 1)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn alerts_on_third_instance() {
        let mut store = ClusterStore::new();
        let stack = "at doThing (app.js:10)";
        assert!(store.ingest(&entry("boom", Some(stack), 0)).is_none());
        assert!(store.ingest(&entry("boom", Some(stack), 1)).is_none());
        let alert = store.ingest(&entry("boom", Some(stack), 2));
        assert!(alert.is_some());
    }

    #[test]
    fn stackless_identical_messages_cluster_on_message_alone() {
        let mut store = ClusterStore::new();
        assert!(store.ingest(&entry("network timeout", None, 0)).is_none());
        assert!(store
            .ingest(&entry("network timeout", None, 100))
            .is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweeps_expired_clusters() {
        let mut store = ClusterStore::new();
        let stack = "at doThing (app.js:10)";
        store.ingest(&entry("boom", Some(stack), 0));
        store.ingest(&entry("boom", Some(stack), 1));
        let future = Utc::now() + Duration::minutes(10);
        assert_eq!(store.sweep_expired(future), 1);
    }
}
