use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Soft threshold: per-buffer capacities halve, network-body capture stops.
pub const SOFT_LIMIT_BYTES: usize = 20 * 1024 * 1024;
/// Hard threshold: ingest starts returning 503.
pub const HARD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Per-entry-kind byte average used by the cheap periodic memory-pressure
/// estimate (spec.md §4.10) — the precise sum is still tracked per ring via
/// [`crate::ring::RingBuffer::bytes_used`]; these averages only back up an
/// independent sanity estimate the alarm can compute without walking every
/// ring.
pub const AVG_CONSOLE_ENTRY_BYTES: usize = 500;
pub const AVG_WEBSOCKET_EVENT_BYTES: usize = 300;
pub const AVG_NETWORK_BODY_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MemoryState {
    Normal = 0,
    Soft = 1,
    Hard = 2,
}

impl From<u8> for MemoryState {
    fn from(v: u8) -> Self {
        match v {
            2 => MemoryState::Hard,
            1 => MemoryState::Soft,
            _ => MemoryState::Normal,
        }
    }
}

/// Atomic holder so the hot ingest path can check the current state with a
/// single relaxed load instead of taking a lock.
#[derive(Debug, Default)]
pub struct MemoryStateCell(AtomicU8);

impl MemoryStateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(MemoryState::Normal as u8))
    }

    pub fn get(&self) -> MemoryState {
        MemoryState::from(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, state: MemoryState) {
        self.0.store(state as u8, Ordering::Relaxed);
    }

    pub fn classify(total_bytes: usize) -> MemoryState {
        if total_bytes >= HARD_LIMIT_BYTES {
            MemoryState::Hard
        } else if total_bytes >= SOFT_LIMIT_BYTES {
            MemoryState::Soft
        } else {
            MemoryState::Normal
        }
    }
}
