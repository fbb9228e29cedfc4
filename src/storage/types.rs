use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Last known outcome of an external transcription attempt.
///
/// Purely informational: the vault never moves a record between states on its
/// own. Callers set it through `Vault::set_status` after talking to the
/// transcription service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    #[default]
    Pending,
    Synced,
    Failed,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Pending => "pending",
            BackupStatus::Synced => "synced",
            BackupStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BackupStatus::Pending),
            "synced" => Ok(BackupStatus::Synced),
            "failed" => Ok(BackupStatus::Failed),
            other => Err(format!("unknown backup status '{}'", other)),
        }
    }
}

/// A single vaulted recording.
///
/// Identity, payload, label and creation time are fixed at save time. The
/// record is only ever written or removed as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: Uuid,
    pub blob: Vec<u8>,
    pub filename: String,
    /// Creation time in epoch milliseconds. Sort key and retention clock.
    pub timestamp: i64,
    pub duration_seconds: Option<f64>,
    pub status: BackupStatus,
}

impl BackupRecord {
    /// Builds a fresh `pending` record with a newly allocated id.
    pub fn new(blob: Vec<u8>, filename: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            blob,
            filename: filename.into(),
            timestamp,
            duration_seconds: None,
            status: BackupStatus::Pending,
        }
    }

    pub fn with_duration(mut self, duration_seconds: Option<f64>) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    /// Same record (same id, blob, name and timestamp) carrying a new status.
    pub fn with_status(mut self, status: BackupStatus) -> Self {
        self.status = status;
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.blob.len() as u64
    }

    /// MIME type guessed from the filename, `application/octet-stream` when unknown.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn summary(&self) -> BackupSummary {
        BackupSummary {
            id: self.id,
            filename: self.filename.clone(),
            timestamp: self.timestamp,
            duration_seconds: self.duration_seconds,
            status: self.status,
            size: self.size(),
        }
    }
}

/// Record metadata without the payload.
///
/// Used as the on-disk sidecar of the directory store and as the listing
/// shape served over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSummary {
    pub id: Uuid,
    pub filename: String,
    pub timestamp: i64,
    pub duration_seconds: Option<f64>,
    pub status: BackupStatus,
    pub size: u64,
}

impl BackupSummary {
    pub fn into_record(self, blob: Vec<u8>) -> BackupRecord {
        BackupRecord {
            id: self.id,
            blob,
            filename: self.filename,
            timestamp: self.timestamp,
            duration_seconds: self.duration_seconds,
            status: self.status,
        }
    }
}

/// Orders records most recent first. Equal timestamps fall back to the id so
/// the result never depends on the order the backend returned rows in.
pub fn sort_newest_first(records: &mut [BackupRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}
