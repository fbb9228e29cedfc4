use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tempfile::NamedTempFile;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::{RecordStore, SCHEMA_VERSION};
use crate::storage::types::{BackupRecord, BackupSummary};

/// Directory-backed record store.
///
/// Layout under the root:
/// - `VERSION`: schema version, written once at creation
/// - `records/<id>.bin`: the payload
/// - `records/<id>.json`: a `BackupSummary` sidecar, written after the payload
///
/// Every file is written to a temporary file in the same directory and renamed
/// into place, so a record is visible only once both halves are complete.
pub struct FileStore {
    base_path: PathBuf,
    ready: OnceCell<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            ready: OnceCell::new(),
        }
    }

    fn records_dir(&self) -> PathBuf {
        self.base_path.join("records")
    }

    fn blob_path(&self, id: Uuid) -> PathBuf {
        self.records_dir().join(format!("{}.bin", id))
    }

    fn meta_path(&self, id: Uuid) -> PathBuf {
        self.records_dir().join(format!("{}.json", id))
    }

    async fn ensure_ready(&self) -> Result<(), StorageError> {
        self.ready
            .get_or_try_init(|| {
                let base_path = self.base_path.clone();
                async move {
                    tokio::task::spawn_blocking(move || create_layout(&base_path, SCHEMA_VERSION))
                        .await
                        .map_err(|e| StorageError::Unavailable(e.to_string()))?
                }
            })
            .await
            .map(|_| ())
    }
}

/// Creates the directory layout and writes `VERSION` if the stored version is
/// older than `target`. An equal or newer stored version is left untouched.
fn create_layout(base_path: &Path, target: i32) -> Result<(), StorageError> {
    let records = base_path.join("records");
    fs::create_dir_all(&records).map_err(|e| {
        error!("Failed to create records dir {}: {}", records.display(), e);
        StorageError::Unavailable(e.to_string())
    })?;

    let version_path = base_path.join("VERSION");
    let current = match fs::read_to_string(&version_path) {
        Ok(s) => s.trim().parse::<i32>().map_err(|e| {
            error!("Corrupt VERSION file {}: {}", version_path.display(), e);
            StorageError::Unavailable(format!("corrupt VERSION file: {}", e))
        })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(StorageError::Unavailable(e.to_string())),
    };

    if target > current {
        atomic_write(base_path, &version_path, target.to_string().as_bytes())
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        info!(
            "FileStore initialized at {} (schema version {})",
            base_path.display(),
            target
        );
    } else {
        debug!("FileStore at {} already at version {}", base_path.display(), current);
    }
    Ok(())
}

/// Writes `data` to a temp file in `dir`, syncs it and renames it over `dest`.
fn atomic_write(dir: &Path, dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn read_records(records_dir: &Path) -> Result<Vec<BackupRecord>, StorageError> {
    let entries = fs::read_dir(records_dir).map_err(|e| {
        error!("Failed to read records dir {}: {}", records_dir.display(), e);
        StorageError::Read(e.to_string())
    })?;

    let mut records = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StorageError::Read(e.to_string()))?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(record) = read_record(&path)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Reads the record whose metadata sidecar is `meta_path`. A missing, torn or
/// unreadable record is `None`.
fn read_record(meta_path: &Path) -> Result<Option<BackupRecord>, StorageError> {
    let meta = match fs::read(meta_path) {
        Ok(bytes) => bytes,
        // Absent, or deleted by another process after read_dir
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Read(e.to_string())),
    };
    let summary: BackupSummary = match serde_json::from_slice(&meta) {
        Ok(s) => s,
        Err(e) => {
            warn!("Skipping unreadable metadata {}: {}", meta_path.display(), e);
            return Ok(None);
        }
    };
    let blob = match fs::read(meta_path.with_extension("bin")) {
        Ok(blob) => blob,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Skipping {}: payload missing", summary.id);
            return Ok(None);
        }
        Err(e) => return Err(StorageError::Read(e.to_string())),
    };
    if blob.len() as u64 != summary.size {
        warn!(
            "Skipping {}: payload is {} bytes, metadata says {}",
            summary.id,
            blob.len(),
            summary.size
        );
        return Ok(None);
    }
    Ok(Some(summary.into_record(blob)))
}

#[async_trait]
impl RecordStore for FileStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.ensure_ready().await
    }

    async fn put(&self, record: &BackupRecord) -> Result<(), StorageError> {
        self.ensure_ready().await?;
        let dir = self.records_dir();
        let blob_path = self.blob_path(record.id);
        let meta_path = self.meta_path(record.id);
        let meta = serde_json::to_vec_pretty(&record.summary())
            .map_err(|e| StorageError::Write(e.to_string()))?;
        let blob = record.blob.clone();
        let id = record.id;

        tokio::task::spawn_blocking(move || {
            atomic_write(&dir, &blob_path, &blob)?;
            atomic_write(&dir, &meta_path, &meta)
        })
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?
        .map_err(|e| {
            error!("Failed to write backup {}: {}", id, e);
            StorageError::Write(e.to_string())
        })?;
        debug!("Stored backup {} ({} bytes)", id, record.size());
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<BackupRecord>, StorageError> {
        self.ensure_ready().await?;
        let dir = self.records_dir();
        let records = tokio::task::spawn_blocking(move || read_records(&dir))
            .await
            .map_err(|e| StorageError::Read(e.to_string()))??;
        debug!("Loaded {} backup(s) from {}", records.len(), self.base_path.display());
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<BackupRecord>, StorageError> {
        self.ensure_ready().await?;
        let meta_path = self.meta_path(id);
        tokio::task::spawn_blocking(move || read_record(&meta_path))
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        self.ensure_ready().await?;
        let meta_path = self.meta_path(id);
        let blob_path = self.blob_path(id);
        // Metadata goes first so a half-finished delete never leaves a listable record
        let removed = tokio::task::spawn_blocking(move || {
            let had_meta = remove_if_present(&meta_path)?;
            remove_if_present(&blob_path)?;
            Ok::<_, std::io::Error>(had_meta)
        })
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?
        .map_err(|e| {
            error!("Failed to delete backup {}: {}", id, e);
            StorageError::Write(e.to_string())
        })?;
        debug!("Delete of backup {} removed={}", id, removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::BackupStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get_all() {
        let dir = TempDir::new().unwrap();
        let storage = FileStore::new(dir.path());
        let record = BackupRecord::new(b"OggS....".to_vec(), "voice.ogg", 77).with_duration(Some(1.5));
        storage.put(&record).await.unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all, vec![record]);
        assert_eq!(
            fs::read_to_string(dir.path().join("VERSION")).unwrap(),
            SCHEMA_VERSION.to_string()
        );
    }

    #[tokio::test]
    async fn test_put_overwrites_and_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileStore::new(dir.path());
        let record = BackupRecord::new(vec![1, 2, 3], "a.webm", 1);
        storage.put(&record).await.unwrap();
        storage
            .put(&record.clone().with_status(BackupStatus::Failed))
            .await
            .unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, BackupStatus::Failed);

        assert!(storage.delete(record.id).await.unwrap());
        assert!(!storage.delete(record.id).await.unwrap());
        assert!(storage.get_all().await.unwrap().is_empty());
        assert!(!storage.blob_path(record.id).exists());
    }

    #[tokio::test]
    async fn test_torn_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let storage = FileStore::new(dir.path());
        let good = BackupRecord::new(vec![5; 10], "good.webm", 1);
        let torn = BackupRecord::new(vec![6; 10], "torn.webm", 2);
        storage.put(&good).await.unwrap();
        storage.put(&torn).await.unwrap();

        // Payload truncated behind the store's back
        fs::write(storage.blob_path(torn.id), [6; 3]).unwrap();
        // Orphan payload without metadata
        fs::write(storage.records_dir().join(format!("{}.bin", Uuid::new_v4())), [0; 4]).unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all, vec![good.clone()]);
        assert_eq!(storage.get(good.id).await.unwrap(), Some(good));
        assert_eq!(storage.get(torn.id).await.unwrap(), None);
        assert_eq!(storage.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_newer_version_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("VERSION"), "7").unwrap();
        let storage = FileStore::new(dir.path());
        storage.initialize().await.unwrap();
        storage.initialize().await.unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("VERSION")).unwrap(), "7");
    }

    #[tokio::test]
    async fn test_unusable_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let storage = FileStore::new(&blocker);
        assert!(matches!(
            storage.put(&BackupRecord::new(vec![], "x", 0)).await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
