//! SSH private key resolution

use std::env;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

/// Where the SSH private key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Explicit path to key file
    Path(PathBuf),
    /// Base64-encoded key held in an environment variable
    Env(String),
}

impl KeySource {
    /// Resolve key source to a readable key file
    ///
    /// For `Env`, decodes base64 and writes an owner-only temp file that is
    /// removed when the returned `ResolvedKey` is dropped.
    ///
    /// # Errors
    /// Returns `KeyError` if the file is missing or too permissive, or the
    /// environment variable is unset or not valid base64.
    pub fn resolve(&self) -> Result<ResolvedKey, KeyError> {
        match self {
            KeySource::Path(path) => {
                if !path.exists() {
                    return Err(KeyError::NotFound(path.display().to_string()));
                }
                validate_key_permissions(path)?;
                Ok(ResolvedKey::Path(path.clone()))
            }
            KeySource::Env(var_name) => {
                let encoded =
                    env::var(var_name).map_err(|_| KeyError::EnvNotSet(var_name.clone()))?;
                let key_data = base64_decode(&encoded).map_err(|_| KeyError::InvalidBase64)?;

                let temp = write_temp_key(&key_data)?;
                Ok(ResolvedKey::Temp(temp))
            }
        }
    }
}

/// Resolved key location
#[derive(Debug)]
pub enum ResolvedKey {
    /// Path to a key file owned by the operator
    Path(PathBuf),
    /// Freshly created owner-only temp file, deleted on drop
    Temp(NamedTempFile),
}

impl ResolvedKey {
    /// Path handed to the SSH library
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ResolvedKey::Path(p) => p,
            ResolvedKey::Temp(file) => file.path(),
        }
    }
}

/// Key resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input.trim())
}

#[cfg(unix)]
fn validate_key_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group and other bits must be clear
    if mode & 0o77 != 0 {
        return Err(KeyError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_key_permissions(_path: &Path) -> Result<(), KeyError> {
    Ok(())
}

fn write_temp_key(key_data: &[u8]) -> Result<NamedTempFile, KeyError> {
    use std::io::Write;

    // Random name, created exclusively with mode 0600
    let mut file = tempfile::Builder::new()
        .prefix("labpower_ssh_key_")
        .tempfile()?;
    file.write_all(key_data)?;
    file.as_file().sync_all()?;

    debug!(path = %file.path().display(), "wrote temporary SSH key");

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var() {
        let source = KeySource::Env("LABPOWER_TEST_KEY_THAT_IS_NOT_SET".to_string());
        assert!(matches!(source.resolve(), Err(KeyError::EnvNotSet(_))));
    }

    #[test]
    fn test_missing_key_file() {
        let source = KeySource::Path(PathBuf::from("/nonexistent/id_ed25519"));
        assert!(matches!(source.resolve(), Err(KeyError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_world_readable_key() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519");
        std::fs::write(&path, b"not really a key").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let source = KeySource::Path(path.clone());
        assert!(matches!(source.resolve(), Err(KeyError::BadPermissions(_))));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        let resolved = source.resolve().unwrap();
        assert_eq!(resolved.path(), path.as_path());
    }

    #[test]
    fn test_env_key_written_to_fresh_private_file() {
        use base64::Engine;

        let var = "LABPOWER_TEST_ENV_KEY_FRESH";
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"secret-key");
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var(var, &encoded) };

        // A pre-existing file with the old predictable name must not be reused
        let stale = env::temp_dir().join(format!("labpower_ssh_key_{}", std::process::id()));
        std::fs::write(&stale, b"planted").unwrap();

        let first = KeySource::Env(var.to_string()).resolve().unwrap();
        let second = KeySource::Env(var.to_string()).resolve().unwrap();
        let path = first.path().to_path_buf();

        assert_ne!(path, stale);
        assert_ne!(path, second.path());
        assert_eq!(std::fs::read(&path).unwrap(), b"secret-key");
        assert_eq!(std::fs::read(&stale).unwrap(), b"planted");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(first);
        assert!(!path.exists());

        std::fs::remove_file(&stale).unwrap();
        unsafe { env::remove_var(var) };
    }
}
