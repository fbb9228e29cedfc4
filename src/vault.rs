//! Vault facade.
//!
//! The single entry point used by recording and retry code. It composes a
//! [`RecordStore`], a [`Notifier`] and the retention sweeper:
//!
//! ```text
//! capture ──save()──▶ RecordStore::put ──▶ Notifier::publish ──▶ local subscribers
//!                                                        └──────▶ other contexts
//! retry UI ──list()──▶ RecordStore::get_all (sorted newest first)
//! startup ──cleanup()──▶ retention::sweep ──delete()──▶ RecordStore::delete ──▶ Notifier
//! ```
//!
//! Example:
//! ```no_run
//! use audio_vault::configuration::Config;
//! use audio_vault::vault::Vault;
//!
//! # async fn run() -> Result<(), audio_vault::error_handling::StorageError> {
//! let (vault, _expired) = Vault::open_with_sweep(&Config::default()).await?;
//! let _sub = vault.on_change(|event| println!("vault changed: {:?}", event));
//! let id = vault.save(vec![0u8; 1024], "session-1.wav").await?;
//! assert_eq!(vault.list().await?[0].id, id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use crate::configuration::{Backend, Config};
use crate::error_handling::types::StorageError;
use crate::notifier::{MutationKind, Notifier, Subscription, VaultEvent};
use crate::retention;
use crate::storage::{
    sort_newest_first, BackupRecord, BackupStatus, DatabaseStore, FileStore, RecordStore,
};


pub struct Vault {
    store: Arc<dyn RecordStore>,
    notifier: Notifier,
}

impl Vault {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Opens the vault described by `config` and initializes its store.
    ///
    /// Fails with `StorageError::Unavailable` if the store cannot be opened;
    /// callers should then carry on without vaulting.
    pub async fn open(config: &Config) -> Result<Self, StorageError> {
        let store: Arc<dyn RecordStore> = match config.backend {
            Backend::Database => Arc::new(DatabaseStore::in_dir(&config.data_dir)),
            Backend::File => Arc::new(FileStore::new(&config.data_dir)),
        };
        store.initialize().await?;

        let notifier = if config.broadcast {
            Notifier::with_broadcast(&config.channel_dir())
        } else {
            Notifier::local_only()
        };
        info!(
            "Vault opened at {} ({} backend)",
            config.data_dir.display(),
            config.backend
        );
        Ok(Self::new(store, notifier))
    }

    /// Opens the vault and runs the startup retention sweep once.
    /// Returns the vault and the number of expired records removed.
    pub async fn open_with_sweep(config: &Config) -> Result<(Self, usize), StorageError> {
        let vault = Self::open(config).await?;
        let removed = vault.cleanup(config.retention_hours).await?;
        Ok((vault, removed))
    }

    /// Persists a new `pending` record and notifies subscribers.
    ///
    /// Once this returns, the record is committed and visible to `list` in
    /// every context.
    pub async fn save(
        &self,
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
    ) -> Result<Uuid, StorageError> {
        self.save_with_duration(bytes, filename, None).await
    }

    pub async fn save_with_duration(
        &self,
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        duration_seconds: Option<f64>,
    ) -> Result<Uuid, StorageError> {
        let record = BackupRecord::new(bytes.into(), filename, retention::now_millis())
            .with_duration(duration_seconds);
        self.store.put(&record).await?;
        info!(
            "Saved backup {} ({}, {} bytes)",
            record.id,
            record.filename,
            record.size()
        );
        self.notifier.publish(MutationKind::Saved, record.id).await;
        Ok(record.id)
    }

    /// All records, most recent first.
    pub async fn list(&self) -> Result<Vec<BackupRecord>, StorageError> {
        let mut records = self.store.get_all().await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BackupRecord>, StorageError> {
        self.store.get(id).await
    }

    /// Removes the record and notifies subscribers. Deleting an id that is
    /// already gone is not an error; the returned flag tells whether this call
    /// removed anything.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let removed = self.store.delete(id).await?;
        debug!("Deleted backup {} (was present: {})", id, removed);
        self.notifier.publish(MutationKind::Deleted, id).await;
        Ok(removed)
    }

    /// Rewrites the whole record with a new status. Returns `None` when no
    /// record has that id; nothing is created in that case.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: BackupStatus,
    ) -> Result<Option<BackupRecord>, StorageError> {
        let Some(record) = self.get(id).await? else {
            debug!("Status change for unknown backup {}", id);
            return Ok(None);
        };
        let record = record.with_status(status);
        self.store.put(&record).await?;
        info!("Backup {} marked {}", id, status);
        self.notifier.publish(MutationKind::Updated, id).await;
        Ok(Some(record))
    }

    /// Runs the retention sweep. Returns how many records were removed.
    pub async fn cleanup(&self, max_age_hours: u64) -> Result<usize, StorageError> {
        retention::sweep(self, max_age_hours).await
    }

    /// Subscribes to changes made by this vault or, when broadcasting, by any
    /// other vault on the same directory.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&VaultEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn is_broadcasting(&self) -> bool {
        self.notifier.is_broadcasting()
    }
}
