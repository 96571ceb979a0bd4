//! Application state shared across HTTP handlers

use std::sync::Arc;

use labpower_core::{AuditLog, Dispatcher, SessionGate};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolves and executes control requests
    pub dispatcher: Arc<Dispatcher>,
    /// Login and session checks
    pub gate: Arc<SessionGate>,
    /// Read side of the audit log
    pub audit: Arc<dyn AuditLog>,
}

impl AppState {
    /// Create new application state
    pub fn new(dispatcher: Dispatcher, gate: SessionGate, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            gate: Arc::new(gate),
            audit,
        }
    }
}
