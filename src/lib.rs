// Report Review Library - approval workflow for forestry report records
// This exposes the engine, its store implementations and the ambient stack

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use audit::TracingAuditLog;
#[cfg(feature = "database")]
pub use audit::SqliteAuditLog;
pub use cache::DerivedCache;
pub use config::{config, init_config, ReviewConfig};
pub use error::{HookError, StoreError, WorkflowError, STATUS_MISMATCH_MESSAGE};
pub use store::{ListQuery, MemoryStore, NewRecord, RecordStore};
#[cfg(feature = "database")]
pub use store::SqliteStore;
pub use telemetry::{create_review_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    is_legal_transition, ExtraData, NextState, Principal, RecordType, ReportStatus, ReviewAction,
    ReviewEngine, ReviewableRecord, Role, WorkflowHooks,
};
