//! Retention sweeper.
//!
//! Purges records older than an age threshold, whatever their status. A
//! pending record past the cutoff is removed like any other: the threshold is
//! the only retention contract.
//!
//! The sweep deletes record by record through `Vault::delete`, so every
//! removal is announced to subscribers. It is not atomic; if the process dies
//! halfway the remaining expired records go on the next run. It runs once per
//! process start and is not rescheduled.

use chrono::{Duration, Utc};
use log::{debug, info};

use crate::error_handling::types::StorageError;
use crate::vault::Vault;

/// Threshold used when none is configured.
pub const DEFAULT_MAX_AGE_HOURS: u64 = 48;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Epoch milliseconds before which a record is expired.
pub fn cutoff(now_ms: i64, max_age_hours: u64) -> i64 {
    let max_age = i64::try_from(max_age_hours)
        .ok()
        .and_then(Duration::try_hours)
        .map(|d| d.num_milliseconds())
        .unwrap_or(i64::MAX);
    now_ms.saturating_sub(max_age)
}

/// Whether a record created at `timestamp` is past the threshold.
///
/// Records strictly older than the cutoff expire. A zero threshold expires
/// everything created up to and including `now_ms`.
pub fn is_expired(timestamp: i64, now_ms: i64, max_age_hours: u64) -> bool {
    if max_age_hours == 0 {
        return timestamp <= now_ms;
    }
    timestamp < cutoff(now_ms, max_age_hours)
}

/// Deletes every record older than `max_age_hours`. Returns how many were removed.
pub async fn sweep(vault: &Vault, max_age_hours: u64) -> Result<usize, StorageError> {
    sweep_at(vault, now_millis(), max_age_hours).await
}

/// `sweep` against an explicit clock reading.
pub async fn sweep_at(
    vault: &Vault,
    now_ms: i64,
    max_age_hours: u64,
) -> Result<usize, StorageError> {
    let records = vault.list().await?;
    let total = records.len();
    let mut removed = 0usize;
    for record in records
        .iter()
        .filter(|r| is_expired(r.timestamp, now_ms, max_age_hours))
    {
        debug!(
            "Expiring backup {} ({}, status {})",
            record.id, record.filename, record.status
        );
        if vault.delete(record.id).await? {
            removed += 1;
        }
    }
    info!(
        "Retention sweep removed {} of {} backup(s) (max age {}h)",
        removed, total, max_age_hours
    );
    Ok(removed)
}
