// Report review workflow
//
// Closed status/action vocabularies, a declarative transition table, a coarse
// permission gate, and single/bulk executors built on conditional updates.

pub mod bulk;
pub mod engine;
pub mod executor;
pub mod hooks;
pub mod ordering;
pub mod permissions;
pub mod principal;
pub mod record;
pub mod status;
pub mod transitions;

pub use bulk::BulkExecutor;
pub use engine::ReviewEngine;
pub use executor::SingleExecutor;
pub use hooks::{AuditEntry, AuditLog, CacheInvalidator, CacheScope, WorkflowHooks};
pub use ordering::{OrderTerm, SortColumn, SortDirection, SortSpec};
pub use principal::{Principal, Role};
pub use record::{ExtraData, RecordId, RecordType, ReviewableRecord};
pub use status::{ReportStatus, ReviewAction};
pub use transitions::{is_legal_transition, Denial, Effect, NextState, Outcome};
