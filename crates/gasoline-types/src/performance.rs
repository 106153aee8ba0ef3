use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TabId;

/// A single page-load performance capture. Running per-URL averages are
/// maintained by `gasoline-store` with LRU eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub tab_id: TabId,
    pub url: String,
    pub dcl_ms: f64,
    pub load_ms: f64,
    pub fcp_ms: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub cls: Option<f64>,
    pub inp_ms: Option<f64>,
    pub ttfb_ms: Option<f64>,
    pub dom_interactive_ms: Option<f64>,
    pub request_count: u32,
    pub total_transfer_bytes: u64,
    pub long_tasks: u32,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSnapshot {
    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.url.len()
    }
}

/// Running average of a URL's performance metrics, maintained by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceBaseline {
    pub samples: u32,
    pub avg_load_ms: f64,
    pub avg_lcp_ms: f64,
    pub avg_cls: f64,
}

impl PerformanceBaseline {
    pub fn absorb(&mut self, snapshot: &PerformanceSnapshot) {
        let n = self.samples as f64;
        self.avg_load_ms = (self.avg_load_ms * n + snapshot.load_ms) / (n + 1.0);
        if let Some(lcp) = snapshot.lcp_ms {
            self.avg_lcp_ms = (self.avg_lcp_ms * n + lcp) / (n + 1.0);
        }
        if let Some(cls) = snapshot.cls {
            self.avg_cls = (self.avg_cls * n + cls) / (n + 1.0);
        }
        self.samples += 1;
    }

    /// Percentage regression of `load_ms` against the baseline average.
    pub fn load_regression_pct(&self, snapshot: &PerformanceSnapshot) -> f64 {
        if self.avg_load_ms <= 0.0 {
            return 0.0;
        }
        ((snapshot.load_ms - self.avg_load_ms) / self.avg_load_ms) * 100.0
    }
}
