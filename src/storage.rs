//! Storage subsystem
//!
//! This module provides the record store abstraction and its implementations
//! for persisting audio backups.
//!
//! Components:
//! - `storage_trait`: the `RecordStore` trait defining a uniform async API.
//! - `types`: `BackupRecord` and the shared data types.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `file_storage`: directory-backed implementation for simple persistence and inspection.
//! - `db_entities`: SeaORM entity model for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use database_storage::DatabaseStore;
pub use file_storage::FileStore;
pub use storage_trait::{RecordStore, SCHEMA_VERSION};
pub use types::{sort_newest_first, BackupRecord, BackupStatus, BackupSummary};
