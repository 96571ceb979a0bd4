//! Power executor trait

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::addr::Target;
use crate::error::ExecError;

/// The remote power primitive to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    /// Immediate forced shutdown
    Shutdown,
    /// Immediate forced restart
    Restart,
}

impl PowerAction {
    /// Lowercase name used in logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PowerAction::Shutdown => "shutdown",
            PowerAction::Restart => "restart",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues power commands to one kind of target transport.
///
/// A successful return means the command was handed to the transport without
/// local error. It does not confirm that the remote machine obeyed.
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait PowerExecutor: Send + Sync {
    /// Issue `action` against `target`
    async fn execute(&self, target: &Target, action: PowerAction) -> Result<(), ExecError>;

    /// Short transport name for logs
    fn executor_type(&self) -> &'static str;
}
