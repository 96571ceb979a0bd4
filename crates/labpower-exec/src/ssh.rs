//! Remote power control of Unix machines over SSH using the russh crate
//!
//! The remote command is a fixed string chosen from the action; the target
//! address is only ever used as the connection endpoint.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{ChannelMsg, Disconnect, client};
use tracing::{debug, error, info, instrument};

use crate::addr::{HostAddr, Target};
use crate::error::ExecError;
use crate::keys::{KeySource, ResolvedKey};
use crate::traits::{PowerAction, PowerExecutor};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Lab machines are reinstalled often; host keys are not pinned
        Ok(true)
    }
}

/// SSH power executor
///
/// Opens a fresh session per command: power commands are rare and the
/// connection does not survive them anyway.
pub struct SshPowerExecutor {
    /// Login user on the target machines
    user: String,
    /// SSH port
    port: u16,
    /// Resolved private key
    key: ResolvedKey,
    /// Prefix the command with `sudo -n`
    use_sudo: bool,
}

impl std::fmt::Debug for SshPowerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshPowerExecutor")
            .field("user", &self.user)
            .field("port", &self.port)
            .field("key", &self.key)
            .field("use_sudo", &self.use_sudo)
            .finish()
    }
}

impl SshPowerExecutor {
    /// Create a new SSH executor
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if key resolution fails
    pub fn new(
        user: impl Into<String>,
        port: u16,
        key_source: &KeySource,
        use_sudo: bool,
    ) -> Result<Self, ExecError> {
        let key = key_source
            .resolve()
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

        Ok(Self {
            user: user.into(),
            port,
            key,
            use_sudo,
        })
    }

    /// The exact command line run on the remote machine
    #[must_use]
    pub fn remote_command(&self, action: PowerAction) -> &'static str {
        match (action, self.use_sudo) {
            (PowerAction::Shutdown, false) => "shutdown -h now",
            (PowerAction::Restart, false) => "shutdown -r now",
            (PowerAction::Shutdown, true) => "sudo -n shutdown -h now",
            (PowerAction::Restart, true) => "sudo -n shutdown -r now",
        }
    }

    /// Connect and authenticate to `addr`
    #[instrument(skip(self), fields(host = %addr))]
    async fn connect(&self, addr: &HostAddr) -> Result<client::Handle<SshClientHandler>, ExecError> {
        debug!(port = self.port, user = %self.user, "connecting to SSH");

        let config = Arc::new(client::Config::default());

        let mut session = client::connect(config, (addr.as_str(), self.port), SshClientHandler)
            .await
            .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        let key_pair = load_secret_key(self.key.path(), None)
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        let auth_res = session
            .authenticate_publickey(
                &self.user,
                PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
            )
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(
                "public key authentication failed".to_string(),
            ));
        }

        Ok(session)
    }
}

#[async_trait]
impl PowerExecutor for SshPowerExecutor {
    #[instrument(skip(self), fields(host = %target.address))]
    async fn execute(&self, target: &Target, action: PowerAction) -> Result<(), ExecError> {
        let start = Instant::now();
        let session = self.connect(&target.address).await?;
        let cmd = self.remote_command(action);

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = None;
        let mut stderr = Vec::new();

        // The remote end may drop the connection before reporting an exit
        // status once the shutdown begins; that still counts as dispatched.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::ExtendedData { data, ext: 1 } => {
                    stderr.extend_from_slice(&data);
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    status = Some(exit_status.cast_signed());
                }
                _ => {}
            }
        }

        if let Err(e) = session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!(error = %e, "disconnect after power command failed");
        }

        match status {
            Some(code) if code != 0 => {
                let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
                error!(status = code, stderr = %stderr, command = cmd, "remote power command failed");
                Err(ExecError::CommandFailed {
                    status: code,
                    stderr,
                })
            }
            _ => {
                info!(
                    action = %action,
                    duration = ?start.elapsed(),
                    "power command dispatched over SSH"
                );
                Ok(())
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        "ssh"
    }
}

/// Builder for `SshPowerExecutor`
pub struct SshPowerExecutorBuilder {
    user: String,
    port: u16,
    key_source: Option<KeySource>,
    use_sudo: bool,
}

impl SshPowerExecutorBuilder {
    /// Create builder for the given login user
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            port: DEFAULT_SSH_PORT,
            key_source: None,
            use_sudo: false,
        }
    }

    /// Set SSH key path
    #[must_use]
    pub fn with_key_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.key_source = Some(KeySource::Path(path.into()));
        self
    }

    /// Set key from environment variable (base64)
    #[must_use]
    pub fn with_env_key(mut self, var_name: impl Into<String>) -> Self {
        self.key_source = Some(KeySource::Env(var_name.into()));
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Run the power command through `sudo -n`
    #[must_use]
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Build the executor
    ///
    /// # Errors
    /// Returns `ExecError::ConfigError` if no key was given, or
    /// `ExecError::SshKeyError` if key resolution fails
    pub fn build(self) -> Result<SshPowerExecutor, ExecError> {
        let key_source = self
            .key_source
            .ok_or_else(|| ExecError::ConfigError("no SSH key configured".to_string()))?;
        SshPowerExecutor::new(self.user, self.port, &key_source, self.use_sudo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_key() {
        let result = SshPowerExecutorBuilder::new("root").build();
        assert!(matches!(result, Err(ExecError::ConfigError(_))));
    }

    #[test]
    fn test_builder_reports_key_errors() {
        let result = SshPowerExecutorBuilder::new("root")
            .with_env_key("LABPOWER_TEST_SSH_KEY_UNSET")
            .build();
        assert!(matches!(result, Err(ExecError::SshKeyError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_remote_command_is_fixed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519");
        std::fs::write(&path, b"key").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        let plain = SshPowerExecutorBuilder::new("root")
            .with_key_path(&path)
            .build()
            .unwrap();
        assert_eq!(plain.remote_command(PowerAction::Shutdown), "shutdown -h now");
        assert_eq!(plain.remote_command(PowerAction::Restart), "shutdown -r now");

        let sudo = SshPowerExecutorBuilder::new("labadmin")
            .with_key_path(&path)
            .with_sudo(true)
            .build()
            .unwrap();
        assert_eq!(
            sudo.remote_command(PowerAction::Restart),
            "sudo -n shutdown -r now"
        );
    }

    #[tokio::test]
    #[ignore = "requires SSH server"]
    async fn test_ssh_power_command() {
        // Needs a disposable VM with an authorized test key
    }
}
