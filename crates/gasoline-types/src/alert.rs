use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity, shared by all analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// An analyzer-raised alert, queued until drained into an `observe` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub category: String,
    pub title: String,
    pub detail: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        severity: AlertSeverity,
        category: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            title: title.into(),
            detail: detail.into(),
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}
