pub mod configuration;
pub use configuration::{Backend, Config};

pub mod error_handling;
pub use error_handling::{StorageError, VaultError};

pub mod notifier;
pub use notifier::{EventOrigin, MutationKind, Subscription, VaultEvent};

pub mod retention;

pub mod storage;
pub use storage::{BackupRecord, BackupStatus, RecordStore};

pub mod vault;
pub use vault::Vault;

pub mod web_interface;
