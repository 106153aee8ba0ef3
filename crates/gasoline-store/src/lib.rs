//! Bounded in-memory capture store.
//!
//! Owns every ring buffer the daemon keeps for console/exception/network
//! telemetry, WebSocket events, network bodies, recorded actions, and
//! performance snapshots, plus the memory-pressure state machine that
//! governs their capacities. Analyzers never touch these buffers directly —
//! they subscribe to [`fanout::IngestEvent`] and keep their own derived
//! state.

pub mod dedup;
pub mod estimate;
pub mod fanout;
pub mod filter;
pub mod memory;
pub mod performance;
pub mod ring;
mod store;

pub use dedup::{should_merge, merge, DEDUP_WINDOW};
pub use fanout::IngestEvent;
pub use filter::QueryFilter;
pub use memory::{MemoryState, MemoryStateCell, HARD_LIMIT_BYTES, SOFT_LIMIT_BYTES};
pub use performance::PerformanceStore;
pub use ring::{EstimateBytes, RingBuffer};
pub use store::{AppendOutcome, CaptureStore};
