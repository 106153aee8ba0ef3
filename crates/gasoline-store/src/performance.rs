use std::collections::{HashMap, VecDeque};

use gasoline_types::{PerformanceBaseline, PerformanceSnapshot};

use crate::ring::RingBuffer;

const SNAPSHOT_CAP_COUNT: usize = 100;
const SNAPSHOT_CAP_BYTES: usize = 4 * 1024 * 1024;
/// LRU cap on distinct URLs tracked for running-average baselines.
const BASELINE_LRU_CAP: usize = 200;

/// Raw snapshot ring plus a per-URL running-average baseline, LRU-evicted.
pub struct PerformanceStore {
    snapshots: RingBuffer<PerformanceSnapshot>,
    baselines: HashMap<String, PerformanceBaseline>,
    recency: VecDeque<String>,
}

impl Default for PerformanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceStore {
    pub fn new() -> Self {
        Self {
            snapshots: RingBuffer::new(SNAPSHOT_CAP_COUNT, SNAPSHOT_CAP_BYTES),
            baselines: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn record(&mut self, snapshot: PerformanceSnapshot) {
        self.touch(&snapshot.url);
        self.baselines
            .entry(snapshot.url.clone())
            .or_default()
            .absorb(&snapshot);
        self.snapshots.push(snapshot);
    }

    fn touch(&mut self, url: &str) {
        if let Some(pos) = self.recency.iter().position(|u| u == url) {
            self.recency.remove(pos);
        }
        self.recency.push_back(url.to_string());
        while self.recency.len() > BASELINE_LRU_CAP {
            if let Some(oldest) = self.recency.pop_front() {
                self.baselines.remove(&oldest);
            }
        }
    }

    pub fn baseline(&self, url: &str) -> Option<&PerformanceBaseline> {
        self.baselines.get(url)
    }

    pub fn latest(&self) -> Option<&PerformanceSnapshot> {
        self.snapshots.iter().next_back()
    }

    pub fn snapshots(&self) -> impl DoubleEndedIterator<Item = &PerformanceSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.snapshots.bytes_used()
    }
}
