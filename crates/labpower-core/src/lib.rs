//! labpower-core: Action dispatch, audit logging and access control
//!
//! Resolves control requests against the configured fleet, fans power
//! commands out to a `PowerExecutor`, and records one audit entry per
//! request through a single-writer kameo actor.

pub mod action;
pub mod actor;
pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fleet;
pub mod gate;
pub mod message;
pub mod state;

pub use action::{ActionKind, ActionRequest};
pub use actor::audit_writer::AuditWriter;
pub use audit::{AuditEntry, AuditLog, FileAuditLog, BATCH_TARGET};
pub use config::{AuditConfig, ExecutorConfig, ExecutorKind, OperatorConfig, SessionConfig, SshConfig};
pub use dispatcher::{DispatchOutcome, Dispatcher, TargetFailure};
pub use error::{AccessError, AuditError, CoreError, DispatchError};
pub use fleet::Fleet;
pub use gate::{Operator, Session, SessionGate};
pub use message::{AppendEntry, ReadRecent};
pub use state::DispatchState;
