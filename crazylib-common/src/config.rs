//! Configuration loading and database path resolution
//!
//! A missing config file never stops a service: a warning is logged and
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the database location
pub const DATABASE_ENV_VAR: &str = "CRAZYLIB_DATABASE";

/// File name of the SQLite database inside the data folder
pub const DATABASE_FILE_NAME: &str = "crazylib.db";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Explicit database file location
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            max_connections: 8,
        }
    }
}

/// `[api]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the platform config file, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = locate_config_file() else {
            debug!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring unreadable config file: {}", e);
                Self::default()
            }
        }
    }
}

/// Find the config file for this platform
///
/// Linux checks `~/.config/crazylib/config.toml` then
/// `/etc/crazylib/config.toml`; other platforms only the user config dir.
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("crazylib").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/crazylib/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolves the database file location
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. `CRAZYLIB_DATABASE` environment variable
/// 3. `database_path` from the TOML config
/// 4. OS-dependent default (fallback)
#[derive(Debug, Clone)]
pub struct DatabasePathResolver {
    config: TomlConfig,
}

impl DatabasePathResolver {
    pub fn new(config: TomlConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config.database_path {
            return path.clone();
        }

        default_database_path()
    }
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("crazylib"))
        .unwrap_or_else(|| PathBuf::from("./crazylib_data"))
        .join(DATABASE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert!(config.database_path.is_none());
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.api.port, 5730);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [api]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.database.max_connections, 8);
    }

    #[test]
    fn test_default_database_path_ends_with_file_name() {
        assert!(default_database_path().ends_with(DATABASE_FILE_NAME));
    }
}
