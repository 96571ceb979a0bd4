//! Core error types for labpower-core

use thiserror::Error;

use crate::action::ActionKind;

/// Errors raised while building core components from configuration
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Fleet has no targets
    #[error("fleet is empty: configure at least one target")]
    EmptyFleet,

    /// No operator can log in
    #[error("no operators configured")]
    NoOperators,

    /// Operator listed more than once
    #[error("operator configured twice: {0}")]
    DuplicateOperator(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Reasons a request is rejected before any power command is issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The action name is not one of the four known kinds
    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    /// The named address is not part of the fleet
    #[error("unknown target: {0:?}")]
    UnknownTarget(String),

    /// A single-target action arrived without a target
    #[error("{0} requires a target")]
    MissingTarget(ActionKind),
}

/// Audit log failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Reading or writing the log file failed
    #[error("audit I/O error: {0}")]
    Io(String),

    /// Entry could not be encoded
    #[error("audit serialization error: {0}")]
    Serialization(String),

    /// The writer actor is gone
    #[error("audit writer unavailable: {0}")]
    WriterUnavailable(String),
}

impl From<std::io::Error> for AuditError {
    fn from(e: std::io::Error) -> Self {
        AuditError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serialization(e.to_string())
    }
}

/// Access gate failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Bad credentials, or a missing, expired or revoked session
    #[error("access denied")]
    Denied,

    /// Password hashing backend failed
    #[error("password hashing failed: {0}")]
    Hashing(String),
}
