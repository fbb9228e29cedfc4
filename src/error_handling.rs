//! Error types shared by every subsystem of the vault.

pub mod types;

pub use types::{ConfigError, NotifyError, StorageError, VaultError, WebError};
