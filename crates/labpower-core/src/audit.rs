//! Append-only audit log of issued actions
//!
//! One JSON object per line. Lines are only ever appended, so a log cut short
//! by a crash loses at most a partial final line and stays readable.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kameo::actor::{ActorRef, Spawn};
use kameo::error::SendError;
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::actor::audit_writer::AuditWriter;
use crate::error::AuditError;
use crate::message::{AppendEntry, ReadRecent};

/// `target` value recorded for fleet-wide actions
pub const BATCH_TARGET: &str = "ALL";

/// One durable record of an issued action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the action was recorded
    pub timestamp: DateTime<Utc>,
    /// Operator who issued it
    pub actor: String,
    /// Action name, e.g. `restart_all`
    pub action: String,
    /// `name (address)` for single targets, `ALL` for the fleet
    #[serde(rename = "target")]
    pub target_description: String,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        target_description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            target_description: target_description.into(),
        }
    }

    /// Encode as a single newline-terminated line.
    ///
    /// JSON string escaping keeps embedded newlines inside the line.
    ///
    /// # Errors
    /// Returns `AuditError::Serialization` if encoding fails
    pub fn to_line(&self) -> Result<String, AuditError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line written by `to_line`
    ///
    /// # Errors
    /// Returns `AuditError::Serialization` for a malformed line
    pub fn from_line(line: &str) -> Result<Self, AuditError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Durable, append-only store for audit entries
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist `entry`; on success it survives a crash
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Newest `limit` entries, oldest first
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError>;
}

/// File-backed audit log.
///
/// All writes go through one `AuditWriter` actor, so concurrent appends are
/// serialized by its mailbox and each line is written whole.
#[derive(Clone)]
pub struct FileAuditLog {
    path: PathBuf,
    writer: ActorRef<AuditWriter>,
}

impl FileAuditLog {
    /// Open (or create) the log file for appending and start its writer
    ///
    /// # Errors
    /// Returns `AuditError::Io` if the file cannot be opened
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;

        // A crash mid-write leaves a partial last line; close it off so the
        // next entry starts on a fresh line
        let len = file.metadata().await?.len();
        if len > 0 {
            file.seek(SeekFrom::Start(len - 1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                warn!(path = %path.display(), "audit log ends with a partial entry");
                file.write_all(b"\n").await?;
                file.flush().await?;
                file.sync_data().await?;
            }
        }

        let writer = AuditWriter::spawn(AuditWriter::new(path.clone(), file));

        info!(path = %path.display(), "audit log opened");

        Ok(Self { path, writer })
    }

    /// Location of the log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the writer after it drains queued entries
    pub async fn close(&self) {
        if let Err(e) = self.writer.stop_gracefully().await {
            debug!(error = %e, "audit writer already stopped");
        }
    }
}

impl fmt::Debug for FileAuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn writer_error<M>(e: SendError<M, AuditError>) -> AuditError {
    match e {
        SendError::HandlerError(err) => err,
        other => AuditError::WriterUnavailable(other.to_string()),
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.writer
            .ask(AppendEntry {
                entry: entry.clone(),
            })
            .await
            .map_err(writer_error)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.writer
            .ask(ReadRecent { limit })
            .await
            .map_err(writer_error)
    }
}
