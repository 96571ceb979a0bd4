//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use crate::audit::AuditEntry;

// ============================================================================
// AuditWriter Messages
// ============================================================================

/// Append one entry and sync it to disk before replying
#[derive(Debug)]
pub struct AppendEntry {
    /// Entry to persist
    pub entry: AuditEntry,
}

/// Read back the newest entries, oldest first
#[derive(Debug)]
pub struct ReadRecent {
    /// Maximum number of entries to return
    pub limit: usize,
}
