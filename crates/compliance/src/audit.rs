//! Append-only compliance audit journal
//!
//! Every gate decision writes an [`AuditEntry`]. The journal is the one
//! piece of compliance state that must outlive a restart: opt-outs are
//! replayed from it at startup. Two implementations:
//! - [`InMemoryAuditLog`] for tests and single-run tools
//! - [`JsonlAuditLog`] appending one JSON object per line, fsync'd

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::record::{DenyReason, OptOutReason};
use crate::ComplianceError;

/// What happened, from the gate's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AuditEvent {
    SendAllowed {
        daily_count: u32,
        monthly_count: u32,
    },
    SendDenied {
        reason: DenyReason,
    },
    SendRecorded {
        success: bool,
    },
    OptOut {
        reason: OptOutReason,
    },
    InboundProcessed {
        opt_out: bool,
    },
}

/// One immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub at: DateTime<Utc>,
    pub phone: String,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditEntry {
    pub fn new(phone: impl Into<String>, event: AuditEvent) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            at: Utc::now(),
            phone: phone.into(),
            event,
        }
    }
}

/// Pluggable journal backend
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry. Append-only; entries are never rewritten.
    async fn append(&self, entry: &AuditEntry) -> Result<(), ComplianceError>;

    /// Replay all persisted opt-out entries (phone, reason, at).
    async fn load_opt_outs(
        &self,
    ) -> Result<Vec<(String, OptOutReason, DateTime<Utc>)>, ComplianceError>;
}

/// In-memory journal for tests
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ComplianceError> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn load_opt_outs(
        &self,
    ) -> Result<Vec<(String, OptOutReason, DateTime<Utc>)>, ComplianceError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter_map(|e| match &e.event {
                AuditEvent::OptOut { reason } => Some((e.phone.clone(), *reason, e.at)),
                _ => None,
            })
            .collect())
    }
}

/// JSONL file journal. Entries are fsync'd so an opt-out survives a crash
/// immediately after it is processed.
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ComplianceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let line = serde_json::to_string(entry)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn load_opt_outs(
        &self,
    ) -> Result<Vec<(String, OptOutReason, DateTime<Utc>)>, ComplianceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut opt_outs = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // A torn trailing line (crash mid-append) is skipped, not fatal
            let entry: AuditEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable audit line");
                    continue;
                }
            };
            if let AuditEvent::OptOut { reason } = entry.event {
                opt_outs.push((entry.phone, reason, entry.at));
            }
        }
        Ok(opt_outs)
    }
}
