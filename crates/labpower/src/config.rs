//! Configuration loading and types

use std::path::{Path, PathBuf};

use labpower_core::{AuditConfig, ExecutorConfig, Fleet, OperatorConfig, SessionConfig};
use labpower_exec::Target;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the labpower daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,
    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Power executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Operators allowed to log in
    #[serde(default)]
    pub operator: Vec<OperatorConfig>,
    /// Controllable machines
    #[serde(default)]
    pub target: Vec<Target>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed, or fails validation
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        let config = Self::parse(&content)
            .map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns error on malformed TOML, an invalid target address, or a
    /// config with no operators or targets
    pub fn parse(content: &str) -> eyre::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the first config file found
    ///
    /// # Errors
    /// Returns error if no config file exists or the one found is invalid
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("LABPOWER_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        for path in Self::search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "using config file");
                return Self::load(&path);
            }
        }

        // No usable default: a daemon without operators or targets can do nothing
        eyre::bail!("no config file found (set LABPOWER_CONFIG or create labpower.toml)")
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("labpower.toml"),
            PathBuf::from("/etc/labpower/labpower.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("labpower/labpower.toml"));
        }
        paths
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.operator.is_empty() {
            eyre::bail!("at least one [[operator]] is required");
        }
        if self.target.is_empty() {
            eyre::bail!("at least one [[target]] is required");
        }
        if self.executor.timeout_secs == 0 {
            eyre::bail!("executor.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Build the immutable fleet from the configured targets
    ///
    /// # Errors
    /// Returns error if the target list is empty
    pub fn fleet(&self) -> eyre::Result<Fleet> {
        Ok(Fleet::new(self.target.iter().cloned())?)
    }
}
