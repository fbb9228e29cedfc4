use std::fmt;

use serde::Deserialize;

/// Which record store implementation backs the vault.
#[derive(Debug, PartialEq, Clone, Copy, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database file (`vault.sqlite3`)
    #[default]
    Database,
    /// Plain directory of payload and metadata files
    File,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Database => f.write_str("database"),
            Backend::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: String::from("127.0.0.1"),
            port: 8765,
        }
    }
}
