use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, error, info};
use sea_orm::sea_query::OnConflict;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sea_orm::sqlx::ConnectOptions as _;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    SqlxSqliteConnector, Statement, TransactionTrait,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::db_entities::{ActiveModel, Column, Entity, Model};
use crate::storage::storage_trait::{RecordStore, SCHEMA_VERSION};
use crate::storage::types::{BackupRecord, BackupStatus};

impl Model {
    fn into_record(self) -> Result<BackupRecord, StorageError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StorageError::Read(format!("invalid id '{}': {}", self.id, e)))?;
        let status = self
            .status
            .parse::<BackupStatus>()
            .map_err(StorageError::Read)?;
        Ok(BackupRecord {
            id,
            blob: self.blob,
            filename: self.filename,
            timestamp: self.timestamp,
            duration_seconds: self.duration_seconds,
            status,
        })
    }
}

fn active_model(record: &BackupRecord) -> ActiveModel {
    ActiveModel {
        id: Set(record.id.to_string()),
        blob: Set(record.blob.clone()),
        filename: Set(record.filename.clone()),
        timestamp: Set(record.timestamp),
        duration_seconds: Set(record.duration_seconds),
        status: Set(record.status.as_str().to_string()),
    }
}

/// SQLite-backed record store.
///
/// The connection is opened lazily on first use and memoized; every process
/// opening the same file shares the database through SQLite's own locking.
pub struct DatabaseStore {
    path: PathBuf,
    conn: OnceCell<DatabaseConnection>,
}

impl DatabaseStore {
    /// Database filename used inside a vault directory
    pub const DEFAULT_DB_FILE: &'static str = "vault.sqlite3";

    /// Store located at `<dir>/vault.sqlite3`. Nothing is opened yet.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new_file(dir.as_ref().join(Self::DEFAULT_DB_FILE))
    }

    pub fn new_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle, opening the database on first call. Concurrent first
    /// callers wait on the same pending open.
    pub async fn connection(&self) -> Result<&DatabaseConnection, StorageError> {
        self.conn.get_or_try_init(|| Self::open(&self.path)).await
    }

    async fn open(path: &Path) -> Result<DatabaseConnection, StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create vault dir {}: {}", parent.display(), e);
                StorageError::Unavailable(e.to_string())
            })?;
        }

        // Passed as a filename, not a URL: characters like `?` or `%` in the path stay literal
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .disable_statement_logging();
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| {
                error!("Failed to open vault database {}: {}", path.display(), e);
                StorageError::Unavailable(e.to_string())
            })?;
        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

        migrate(&db, SCHEMA_VERSION).await?;

        info!("Vault database opened at {}", path.display());
        Ok(db)
    }
}

async fn user_version<C: ConnectionTrait>(db: &C) -> Result<i32, StorageError> {
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "PRAGMA user_version",
        ))
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    match row {
        Some(row) => row
            .try_get_by_index::<i32>(0)
            .map_err(|e| StorageError::Unavailable(e.to_string())),
        None => Ok(0),
    }
}

/// Brings the schema up to `target`. Opening at a version lower than or equal
/// to the stored one changes nothing.
pub(crate) async fn migrate(db: &DatabaseConnection, target: i32) -> Result<(), StorageError> {
    let current = user_version(db).await?;
    if target <= current {
        debug!("Vault schema at version {}, no upgrade needed", current);
        return Ok(());
    }

    info!("Upgrading vault schema from version {} to {}", current, target);
    let txn = db
        .begin()
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    if current < 1 {
        txn.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS audio_backups (
                id TEXT PRIMARY KEY NOT NULL,
                blob BLOB NOT NULL,
                filename TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                duration_seconds REAL,
                status TEXT NOT NULL
            );",
        )
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    }
    txn.execute_unprepared(&format!("PRAGMA user_version = {};", target))
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    txn.commit()
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl RecordStore for DatabaseStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.connection().await.map(|_| ())
    }

    async fn put(&self, record: &BackupRecord) -> Result<(), StorageError> {
        let db = self.connection().await?;
        Entity::insert(active_model(record))
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::Blob,
                        Column::Filename,
                        Column::Timestamp,
                        Column::DurationSeconds,
                        Column::Status,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(|e| {
                error!("Failed to write backup {}: {}", record.id, e);
                StorageError::Write(e.to_string())
            })?;
        debug!("Stored backup {} ({} bytes)", record.id, record.size());
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<BackupRecord>, StorageError> {
        let db = self.connection().await?;
        let rows = Entity::find().all(db).await.map_err(|e| {
            error!("Failed to read backups: {}", e);
            StorageError::Read(e.to_string())
        })?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.into_record()?);
        }
        debug!("Loaded {} backup(s) from {}", out.len(), self.path.display());
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> Result<Option<BackupRecord>, StorageError> {
        let db = self.connection().await?;
        let row = Entity::find_by_id(id.to_string())
            .one(db)
            .await
            .map_err(|e| {
                error!("Failed to read backup {}: {}", id, e);
                StorageError::Read(e.to_string())
            })?;
        row.map(Model::into_record).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let db = self.connection().await?;
        let res = Entity::delete_by_id(id.to_string())
            .exec(db)
            .await
            .map_err(|e| {
                error!("Failed to delete backup {}: {}", id, e);
                StorageError::Write(e.to_string())
            })?;
        debug!("Delete of backup {} removed {} row(s)", id, res.rows_affected);
        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, DatabaseStore) {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::in_dir(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_db_put_and_get_all() {
        let (_dir, store) = temp_db();
        let record = BackupRecord::new(b"RIFF....WAVE".to_vec(), "a.wav", 1_000)
            .with_duration(Some(2.0));
        store.put(&record).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![record]);
    }

    #[tokio::test]
    async fn test_db_put_overwrites_same_id() {
        let (_dir, store) = temp_db();
        let record = BackupRecord::new(vec![1, 2, 3], "a.webm", 1_000);
        store.put(&record).await.unwrap();
        store
            .put(&record.clone().with_status(BackupStatus::Synced))
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, BackupStatus::Synced);
        assert_eq!(all[0].blob, record.blob);
    }

    #[tokio::test]
    async fn test_db_get_by_id() {
        let (_dir, store) = temp_db();
        let wanted = BackupRecord::new(vec![4; 8], "wanted.wav", 1_000);
        let other = BackupRecord::new(vec![5; 8], "other.wav", 2_000);
        store.put(&wanted).await.unwrap();
        store.put(&other).await.unwrap();

        assert_eq!(store.get(wanted.id).await.unwrap(), Some(wanted));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_db_dir_name_with_url_characters() {
        let dir = TempDir::new().unwrap();
        for name in ["rec?ordings", "rec%41x", "rec#1", "a?mode=ro&b"] {
            let store = DatabaseStore::in_dir(dir.path().join(name));
            let record = BackupRecord::new(vec![6; 4], "take.webm", 1);
            store.put(&record).await.unwrap();
            assert_eq!(store.get_all().await.unwrap(), vec![record]);
            assert!(dir.path().join(name).join(DatabaseStore::DEFAULT_DB_FILE).is_file());
        }
    }

    #[tokio::test]
    async fn test_db_delete_is_idempotent() {
        let (_dir, store) = temp_db();
        let record = BackupRecord::new(vec![9], "a.webm", 1_000);
        store.put(&record).await.unwrap();

        assert!(store.delete(record.id).await.unwrap());
        assert!(!store.delete(record.id).await.unwrap());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_db_concurrent_initialize_shares_one_handle() {
        let (_dir, store) = temp_db();
        let store = Arc::new(store);
        let (a, b, c) = tokio::join!(store.connection(), store.connection(), store.initialize());
        let (a, b) = (a.unwrap(), b.unwrap());
        c.unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[tokio::test]
    async fn test_db_schema_version_is_gated() {
        let (dir, store) = temp_db();
        let record = BackupRecord::new(vec![7; 16], "keep.webm", 5);
        store.put(&record).await.unwrap();
        let db = store.connection().await.unwrap();
        assert_eq!(user_version(db).await.unwrap(), SCHEMA_VERSION);

        // Same or lower versions leave the existing table and rows alone
        migrate(db, SCHEMA_VERSION).await.unwrap();
        migrate(db, 0).await.unwrap();
        assert_eq!(user_version(db).await.unwrap(), SCHEMA_VERSION);

        let reopened = DatabaseStore::in_dir(dir.path());
        assert_eq!(reopened.get_all().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_db_two_handles_see_each_others_writes() {
        let (dir, first) = temp_db();
        let second = DatabaseStore::in_dir(dir.path());
        let record = BackupRecord::new(vec![1; 64], "shared.webm", 42);
        first.put(&record).await.unwrap();

        let seen = second.get_all().await.unwrap();
        assert_eq!(seen, vec![record.clone()]);

        second.delete(record.id).await.unwrap();
        assert!(first.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_db_unopenable_path_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = DatabaseStore::in_dir(&blocker);

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
