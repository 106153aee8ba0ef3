use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AiContext, EnhancedAction, Enrichment, SequenceId, TabId};

/// Log/error/network severity, shared across console entries and noise rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Log,
    Warn,
    Error,
    Info,
    Debug,
}

/// Which ring the entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Console,
    Network,
    Exception,
}

/// A console message, uncaught exception, or network-level error captured
/// from the tracked tab.
///
/// Mutated only by dedup-merge (`_aggregatedCount`/`_lastSeen`); everything
/// else is set once at ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub sequence: SequenceId,
    pub timestamp: DateTime<Utc>,
    pub tab_id: TabId,
    pub level: Level,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub message: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "_actions", default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<EnhancedAction>>,
    #[serde(rename = "_aiContext", default, skip_serializing_if = "Option::is_none")]
    pub ai_context: Option<AiContext>,
    #[serde(rename = "_enrichments", default, skip_serializing_if = "Vec::is_empty")]
    pub enrichments: Vec<Enrichment>,
    #[serde(rename = "_aggregatedCount", default = "one")]
    pub aggregated_count: u32,
    #[serde(rename = "_firstSeen")]
    pub first_seen: DateTime<Utc>,
    #[serde(rename = "_lastSeen")]
    pub last_seen: DateTime<Utc>,
}

fn one() -> u32 {
    1
}

impl TelemetryEntry {
    /// Rough in-memory size, used by the capture store's memory accounting.
    pub fn estimated_bytes(&self) -> usize {
        let base = std::mem::size_of::<Self>();
        let message = self.message.len();
        let stack = self.stack.as_ref().map_or(0, |s| s.len());
        let args: usize = self
            .args
            .iter()
            .map(|v| serde_json::to_string(v).map(|s| s.len()).unwrap_or(0))
            .sum();
        base + message + stack + args
    }

    /// Dedup signature: message + top-3 stack frames + url, used to merge
    /// repeats of the same console error within the 5 s window.
    pub fn dedup_signature(&self) -> String {
        let normalized_stack: String = self
            .stack
            .as_deref()
            .map(|s| s.lines().take(3).collect::<Vec<_>>().join("|"))
            .unwrap_or_default();
        format!(
            "{}::{}::{}",
            self.message,
            normalized_stack,
            self.url.as_deref().unwrap_or("")
        )
    }
}

/// Named snapshot of ring-buffer counts and content digests, used to compute
/// diffs with `analyze { target: "changes" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub counts: std::collections::HashMap<String, usize>,
    pub digests: std::collections::HashMap<String, String>,
}

/// Category a noise rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseCategory {
    Console,
    Network,
    Websocket,
}

/// A user- or auto-generated predicate that suppresses matching entries from
/// tool output without deleting them from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseRule {
    pub id: String,
    pub category: NoiseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_min: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_max: Option<u16>,
    pub label: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
