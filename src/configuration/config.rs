use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::retention::DEFAULT_MAX_AGE_HOURS;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the default vault directory.
pub const VAULT_DIR_ENV: &str = "AUDIO_VAULT_DIR";

/// Longest accepted retention threshold: one year.
const MAX_RETENTION_HOURS: u64 = 24 * 365;

/// Application configuration.
///
/// Loaded from a TOML file; every key is optional and falls back to its
/// default. Command-line flags are applied on top by the binary.
///
/// ```toml
/// data_dir = "/home/me/.local/share/audio-vault"
/// backend = "database"
/// retention_hours = 48
/// broadcast = true
///
/// [web]
/// enabled = true
/// bind_address = "127.0.0.1"
/// port = 8765
/// ```
///
/// # Fields Overview
/// - `data_dir`: vault directory holding the store and the broadcast channel
/// - `backend`: `database` (SQLite) or `file` (plain directory)
/// - `retention_hours`: age threshold applied by the startup sweep
/// - `broadcast`: whether other processes on the same vault are notified
/// - `web`: local HTTP download surface
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub retention_hours: u64,
    pub broadcast: bool,
    pub web: WebConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            retention_hours: DEFAULT_MAX_AGE_HOURS,
            broadcast: true,
            web: WebConfig::default(),
        }
    }
}

/// `$AUDIO_VAULT_DIR`, or `./vault` when unset.
pub fn default_data_dir() -> PathBuf {
    std::env::var_os(VAULT_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("vault"))
}

impl Config {
    /// Parses and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        info!("Loading configuration from {}", path.display());
        if !path.exists() {
            return Err(ConfigError::DirectoryDoesNotExist(format!(
                "configuration file {} not found",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_hours > MAX_RETENTION_HOURS {
            return Err(ConfigError::NotInRange(format!(
                "retention_hours must be at most {}, got {}",
                MAX_RETENTION_HOURS, self.retention_hours
            )));
        }
        if self.web.enabled && self.web.port < 1024 {
            return Err(ConfigError::NotInRange(format!(
                "web.port must be in 1024-65535, got {}",
                self.web.port
            )));
        }
        Ok(())
    }

    /// Web settings for an explicit `serve`, with an optional port override.
    ///
    /// Asking to serve enables the web interface, so the result is checked
    /// with the same rules as an enabled `[web]` table.
    pub fn serve_settings(&self, port: Option<u16>) -> Result<WebConfig, ConfigError> {
        let mut config = self.clone();
        config.web.enabled = true;
        if let Some(port) = port {
            config.web.port = port;
        }
        config.validate()?;
        Ok(config.web)
    }

    /// Directory the broadcast channel sockets live in.
    pub fn channel_dir(&self) -> PathBuf {
        self.data_dir.join("channel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_full() {
        let config = Config::from_toml(
            r#"
            data_dir = "/tmp/vault"
            backend = "file"
            retention_hours = 12
            broadcast = false

            [web]
            enabled = true
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vault"));
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.retention_hours, 12);
        assert!(!config.broadcast);
        assert!(config.web.enabled);
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.bind_address, "127.0.0.1");
        assert_eq!(config.channel_dir(), PathBuf::from("/tmp/vault/channel"));
    }

    #[test]
    #[serial]
    fn test_defaults_follow_environment() {
        std::env::set_var(VAULT_DIR_ENV, "/srv/recordings");
        let config = Config::from_toml("").unwrap();
        std::env::remove_var(VAULT_DIR_ENV);

        assert_eq!(config.data_dir, PathBuf::from("/srv/recordings"));
        assert_eq!(config.backend, Backend::Database);
        assert_eq!(config.retention_hours, DEFAULT_MAX_AGE_HOURS);
        assert!(config.broadcast);
        assert!(!config.web.enabled);
    }

    #[test]
    #[serial]
    fn test_default_dir_without_environment() {
        std::env::remove_var(VAULT_DIR_ENV);
        assert_eq!(Config::default().data_dir, PathBuf::from("vault"));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let err = Config::from_toml("retention_hours = 100000").unwrap_err();
        assert!(matches!(err, ConfigError::NotInRange(_)));

        let err = Config::from_toml("[web]\nenabled = true\nport = 80").unwrap_err();
        assert!(matches!(err, ConfigError::NotInRange(_)));
    }

    #[test]
    fn test_serve_settings_validate_the_override() {
        let config = Config::from_toml("[web]\nport = 80").unwrap();
        assert!(!config.web.enabled);

        assert!(matches!(
            config.serve_settings(None),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::default().serve_settings(Some(80)),
            Err(ConfigError::NotInRange(_))
        ));

        let web = config.serve_settings(Some(9000)).unwrap();
        assert!(web.enabled);
        assert_eq!(web.port, 9000);
        assert_eq!(web.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_bad_toml_and_missing_file() {
        assert!(matches!(
            Config::from_toml("backend = \"cloud\""),
            Err(ConfigError::TomlError(_))
        ));

        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::DirectoryDoesNotExist(_))
        ));

        let path = dir.path().join("vault.toml");
        std::fs::write(&path, "retention_hours = 6").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().retention_hours, 6);
    }
}
