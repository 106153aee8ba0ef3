//! Read-only analyzers over the telemetry and network streams: error
//! clustering, API schema inference, contract validation, and third-party
//! origin auditing. Each analyzer owns its own state, guarded by its own
//! lock when wired into the server — this crate itself is single-threaded
//! and side-effect free beyond the structs it returns.

pub mod clustering;
pub mod contract;
pub mod schema;
pub mod thirdparty;

pub use clustering::{ClusterStore, ErrorCluster};
pub use contract::{ContractValidator, Violation, ViolationKind, ViolationSeverity};
pub use schema::{EndpointSchema, SchemaStore};
pub use thirdparty::{OriginReport, ReputationLists, Reputation, RiskLevel, ThirdPartyAuditor};
