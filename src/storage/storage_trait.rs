//! Record Store trait
//!
//! This module defines the `RecordStore` trait, the interface every vault
//! storage backend implements.
//!
//! Implementors are responsible for:
//! - Lazily opening (and on first run creating) one logical database
//! - Gating schema creation on a version number
//! - Whole-record inserts, lookups by id, full scans and idempotent deletes
//!
//! Every method is awaitable and resolves only once the underlying engine has
//! committed. No method retries on failure.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::types::BackupRecord;

/// Version written by the initial schema. Later additions must be additive.
pub const SCHEMA_VERSION: i32 = 1;

/// Durable, asynchronous CRUD over `BackupRecord` keyed by `id`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens or creates the backing database.
    ///
    /// Idempotent. Concurrent callers in the same process share one pending
    /// open and end up with the same handle.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Inserts or overwrites the record with `record.id`.
    async fn put(&self, record: &BackupRecord) -> Result<(), StorageError>;

    /// Returns every stored record in no particular order.
    async fn get_all(&self) -> Result<Vec<BackupRecord>, StorageError>;

    /// Looks up one record without reading any other.
    async fn get(&self, id: Uuid) -> Result<Option<BackupRecord>, StorageError>;

    /// Removes the record if present. Returns whether anything was removed;
    /// an absent id is not an error.
    async fn delete(&self, id: Uuid) -> Result<bool, StorageError>;
}
