//! Configuration types consumed by the core

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An operator allowed to log in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Login name, recorded as the audit actor
    pub username: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$...`
    pub password_hash: String,
}

/// Session settings for the access gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl SessionConfig {
    /// Session lifetime
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    8 * 60 * 60
}

/// Audit log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Path of the append-only log file
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
        }
    }
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("lab_actions.log")
}

/// Which transport issues power commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// Local `shutdown /m \\host` against Windows machines
    #[default]
    Windows,
    /// `shutdown` over SSH against Unix machines
    Ssh,
    /// Log only
    DryRun,
}

/// Power executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Transport
    #[serde(default)]
    pub kind: ExecutorKind,
    /// Per-target timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Override for the Windows `shutdown` program path
    pub shutdown_program: Option<PathBuf>,
    /// SSH transport settings
    pub ssh: Option<SshConfig>,
}

impl ExecutorConfig {
    /// Per-target timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            timeout_secs: default_timeout_secs(),
            shutdown_program: None,
            ssh: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}

/// SSH transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// SSH user (defaults to root)
    #[serde(default = "default_user")]
    pub user: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to SSH private key
    pub key_path: Option<PathBuf>,
    /// Environment variable holding a base64-encoded private key
    pub key_env: Option<String>,
    /// Run `shutdown` through `sudo -n`
    #[serde(default)]
    pub use_sudo: bool,
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}
