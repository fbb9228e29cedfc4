use serde::Serialize;
use uuid::Uuid;

use crate::storage::BackupSummary;

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /backups`.
#[derive(Debug, Serialize)]
pub struct BackupListResponse {
    pub count: usize,
    pub total_bytes: u64,
    pub backups: Vec<BackupSummary>,
}

impl BackupListResponse {
    pub fn new(backups: Vec<BackupSummary>) -> Self {
        Self {
            count: backups.len(),
            total_bytes: backups.iter().map(|b| b.size).sum(),
            backups,
        }
    }
}

/// Body of `DELETE /backups/:id`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub deleted: bool,
}

/// `Content-Disposition` value offering the recording as a download under its
/// own name. Characters that cannot appear in a quoted header value are
/// replaced with `_`.
pub fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.trim().is_empty() {
        String::from("recording")
    } else {
        safe
    };
    format!("attachment; filename=\"{}\"", safe)
}
