//! `AuditWriter`: single writer for the audit log file
//!
//! Owns the open file handle. The mailbox serializes concurrent appends.

use std::collections::VecDeque;
use std::path::PathBuf;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::audit::AuditEntry;
use crate::error::AuditError;
use crate::message::{AppendEntry, ReadRecent};

/// Actor appending audit entries to one file
pub struct AuditWriter {
    /// Log file location, used for read-back
    path: PathBuf,
    /// File opened in append mode
    file: File,
    /// Entries appended since start
    appended: u64,
}

impl AuditWriter {
    /// Wrap an already opened append-mode file
    #[must_use]
    pub fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file,
            appended: 0,
        }
    }
}

impl Actor for AuditWriter {
    type Args = Self;
    type Error = AuditError;

    async fn on_start(state: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(id = %actor_ref.id(), path = %state.path.display(), "AuditWriter starting");
        Ok(state)
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, appended = self.appended, "AuditWriter stopping");
        self.file.sync_all().await?;
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<AppendEntry> for AuditWriter {
    type Reply = Result<(), AuditError>;

    async fn handle(
        &mut self,
        msg: AppendEntry,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let line = msg.entry.to_line()?;

        // One write per entry, then force it to stable storage
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;

        self.appended += 1;
        debug!(
            actor = %msg.entry.actor,
            action = %msg.entry.action,
            target = %msg.entry.target_description,
            "audit entry written"
        );

        Ok(())
    }
}

impl Message<ReadRecent> for AuditWriter {
    type Reply = Result<Vec<AuditEntry>, AuditError>;

    async fn handle(
        &mut self,
        msg: ReadRecent,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        // Stream the file, keeping only the newest `limit` entries in memory
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut entries = VecDeque::with_capacity(msg.limit.min(1024));

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match AuditEntry::from_line(&line) {
                Ok(entry) => {
                    if entries.len() == msg.limit {
                        entries.pop_front();
                    }
                    if msg.limit > 0 {
                        entries.push_back(entry);
                    }
                }
                Err(e) => warn!(error = %e, "skipping unreadable audit line"),
            }
        }

        let entries: Vec<AuditEntry> = entries.into();
        Ok(entries)
    }
}
