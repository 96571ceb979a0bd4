//! Executor that logs power commands instead of issuing them

use async_trait::async_trait;
use tracing::info;

use crate::addr::Target;
use crate::error::ExecError;
use crate::traits::{PowerAction, PowerExecutor};

/// Rehearsal executor: every command "succeeds" without touching the network
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    /// Create a new dry-run executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PowerExecutor for DryRunExecutor {
    async fn execute(&self, target: &Target, action: PowerAction) -> Result<(), ExecError> {
        info!(
            host = %target.address,
            name = %target.name,
            action = %action,
            "dry run: power command not issued"
        );
        Ok(())
    }

    fn executor_type(&self) -> &'static str {
        "dry-run"
    }
}
