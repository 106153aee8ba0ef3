//! Bounded on-disk key/value namespaces for project-local state that
//! outlives a single daemon run (noise rules, dismissed alerts, saved
//! configuration). Never touched by the hot ingest path.

pub mod namespace;
pub mod store;

pub use namespace::{Namespace, NamespaceStats, MAX_FILE_BYTES, MAX_NAMESPACE_BYTES};
pub use store::{KvStore, FLUSH_INTERVAL};
