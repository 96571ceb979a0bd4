//! Remote power control of Windows machines via the local `shutdown` program
//!
//! `shutdown /s /m \\<address> /t 0 /f` asks the remote machine to power off
//! immediately, closing applications without prompting.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::addr::Target;
use crate::error::ExecError;
use crate::traits::{PowerAction, PowerExecutor};

/// Default program name, resolved through `PATH`
pub const DEFAULT_SHUTDOWN_PROGRAM: &str = "shutdown";

/// A fully parameterized process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run
    pub program: PathBuf,
    /// Arguments, each passed to the OS as one argv element
    pub args: Vec<String>,
}

/// Executor driving the Windows `shutdown` tool against remote machines
#[derive(Debug, Clone)]
pub struct WindowsShutdownExecutor {
    program: PathBuf,
}

impl WindowsShutdownExecutor {
    /// Create an executor using `shutdown` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_SHUTDOWN_PROGRAM),
        }
    }

    /// Use a specific program path instead of `shutdown`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Build the invocation for `action` against `target`.
    ///
    /// The address only ever appears inside the single `\\<address>` argument.
    #[must_use]
    pub fn invocation(&self, target: &Target, action: PowerAction) -> Invocation {
        let mode = match action {
            PowerAction::Shutdown => "/s",
            PowerAction::Restart => "/r",
        };

        Invocation {
            program: self.program.clone(),
            args: vec![
                mode.to_string(),
                "/m".to_string(),
                format!(r"\\{}", target.address),
                "/t".to_string(),
                "0".to_string(),
                "/f".to_string(),
            ],
        }
    }
}

impl Default for WindowsShutdownExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PowerExecutor for WindowsShutdownExecutor {
    #[instrument(skip(self), fields(host = %target.address))]
    async fn execute(&self, target: &Target, action: PowerAction) -> Result<(), ExecError> {
        let invocation = self.invocation(target, action);
        let start = Instant::now();

        debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            "spawning shutdown program"
        );

        // Dropping the future on timeout must not leave the child running
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                host = %target.address,
                action = %action,
                status,
                stderr = %stderr,
                "shutdown program failed"
            );
            return Err(ExecError::CommandFailed { status, stderr });
        }

        debug!(
            host = %target.address,
            action = %action,
            duration = ?start.elapsed(),
            "power command dispatched"
        );

        Ok(())
    }

    fn executor_type(&self) -> &'static str {
        "windows"
    }
}
