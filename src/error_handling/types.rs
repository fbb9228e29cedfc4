use std::fmt;

use uuid::Uuid;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures surfaced by a record store.
///
/// - `Unavailable`: the storage engine could not be opened. Callers should
///   degrade to a "no vault" mode and keep the audio in memory.
/// - `Write`: a put or delete transaction aborted (quota, IO error, lock).
///   The recording is not lost from memory, only not vaulted.
/// - `Read`: a read transaction failed. UI should offer a retry rather than
///   showing an empty vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Unavailable(String),
    Write(String),
    Read(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(e) => write!(f, "Storage unavailable: {}", e),
            StorageError::Write(e) => write!(f, "Storage write failed: {}", e),
            StorageError::Read(e) => write!(f, "Storage read failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Cross-context channel failures. These never reach the caller of a vault
/// mutation; they are logged and the local mutation still succeeds.
#[derive(Debug)]
pub enum NotifyError {
    Bind(std::io::Error),
    Send(std::io::Error),
    Encode(String),
    Unsupported,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Bind(e) => write!(f, "Broadcast channel bind error: {}", e),
            NotifyError::Send(e) => write!(f, "Broadcast send error: {}", e),
            NotifyError::Encode(e) => write!(f, "Broadcast message encoding error: {}", e),
            NotifyError::Unsupported => {
                write!(f, "Broadcast channel is not supported on this platform")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

/// Errors of the caller-facing flows built on top of the vault (export,
/// status changes, the command line).
#[derive(Debug)]
pub enum VaultError {
    Storage(StorageError),
    NotFound(Uuid),
    Io(std::io::Error),
    Config(ConfigError),
    Web(WebError),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::Storage(e) => write!(f, "{}", e),
            VaultError::NotFound(id) => write!(f, "No backup with id {}", id),
            VaultError::Io(e) => write!(f, "IO error: {}", e),
            VaultError::Config(e) => write!(f, "Configuration error: {}", e),
            VaultError::Web(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        VaultError::Storage(err)
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Io(err)
    }
}

impl From<ConfigError> for VaultError {
    fn from(err: ConfigError) -> Self {
        VaultError::Config(err)
    }
}

impl From<WebError> for VaultError {
    fn from(err: WebError) -> Self {
        VaultError::Web(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_render_their_cause() {
        let err = StorageError::Write("database or disk is full".into());
        assert_eq!(err.to_string(), "Storage write failed: database or disk is full");
    }

    #[test]
    fn vault_error_wraps_storage_error() {
        let err: VaultError = StorageError::Read("locked".into()).into();
        assert!(matches!(err, VaultError::Storage(StorageError::Read(_))));
        assert_eq!(err.to_string(), "Storage read failed: locked");
    }
}
