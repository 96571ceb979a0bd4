//! Executor factory: turns `[executor]` settings into a `PowerExecutor`

use std::sync::Arc;

use eyre::Result;
use labpower_core::{ExecutorConfig, ExecutorKind};
use labpower_exec::{
    DryRunExecutor, PowerExecutor, SshPowerExecutorBuilder, WindowsShutdownExecutor,
};

/// Create the configured executor
///
/// # Errors
/// Returns error if the SSH transport is selected without usable key settings
pub fn create_executor(config: &ExecutorConfig) -> Result<Arc<dyn PowerExecutor>> {
    let executor: Arc<dyn PowerExecutor> = match config.kind {
        ExecutorKind::Windows => {
            let mut executor = WindowsShutdownExecutor::new();
            if let Some(program) = &config.shutdown_program {
                executor = executor.with_program(program);
            }
            Arc::new(executor)
        }
        ExecutorKind::Ssh => {
            let ssh = config
                .ssh
                .as_ref()
                .ok_or_else(|| eyre::eyre!("executor.kind = \"ssh\" requires [executor.ssh]"))?;

            let mut builder = SshPowerExecutorBuilder::new(&ssh.user)
                .with_port(ssh.port)
                .with_sudo(ssh.use_sudo);
            builder = match (&ssh.key_path, &ssh.key_env) {
                (Some(path), None) => builder.with_key_path(path),
                (None, Some(var)) => builder.with_env_key(var),
                (Some(_), Some(_)) => {
                    eyre::bail!("set only one of executor.ssh.key_path and executor.ssh.key_env")
                }
                (None, None) => {
                    eyre::bail!("executor.ssh needs key_path or key_env")
                }
            };

            let executor = builder
                .build()
                .map_err(|e| eyre::eyre!("failed to create SSH executor: {e}"))?;
            Arc::new(executor)
        }
        ExecutorKind::DryRun => Arc::new(DryRunExecutor::new()),
    };

    tracing::info!(
        executor = executor.executor_type(),
        timeout_secs = config.timeout_secs,
        "power executor ready"
    );

    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labpower_core::SshConfig;

    #[test]
    fn test_default_is_windows() {
        let executor = create_executor(&ExecutorConfig::default()).unwrap();
        assert_eq!(executor.executor_type(), "windows");
    }

    #[test]
    fn test_dry_run() {
        let config = ExecutorConfig {
            kind: ExecutorKind::DryRun,
            ..ExecutorConfig::default()
        };
        assert_eq!(create_executor(&config).unwrap().executor_type(), "dry-run");
    }

    #[test]
    fn test_ssh_requires_settings() {
        let mut config = ExecutorConfig {
            kind: ExecutorKind::Ssh,
            ..ExecutorConfig::default()
        };
        assert!(create_executor(&config).is_err());

        config.ssh = Some(SshConfig {
            user: "root".to_string(),
            port: 22,
            key_path: None,
            key_env: None,
            use_sudo: false,
        });
        assert!(create_executor(&config).is_err());
    }
}
