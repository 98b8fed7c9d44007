//! Configuration management.
//!
//! Configuration comes from a TOML file with two optional sections:
//!
//! ```toml
//! [storage]
//! backend = "sqlite"        # or "memory"
//! path = "/var/lib/vercat/catalog.db"
//!
//! [logging]
//! level = "info"
//! format = "json"           # or "pretty"
//! file = "/var/log/vercat.log"
//! ```
//!
//! `VERCAT_STORAGE` and `VERCAT_DB_PATH` override the storage section.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default `SQLite` database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".vercat/catalog.db";

/// Main configuration for a catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Storage backend selection.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Storage backend selection.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Which backend to open.
    pub backend: StorageBackendType,
    /// Database file for the `SQLite` backend.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::default(),
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackendType {
    /// Embedded `SQLite` database.
    #[default]
    Sqlite,
    /// Non-persistent in-memory tables.
    Memory,
}

impl StorageBackendType {
    /// Parses a backend name. Unknown names fall back to `SQLite`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Self::Memory,
            _ => Self::Sqlite,
        }
    }
}

/// Logging section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `vercat=debug`.
    pub level: Option<String>,
    /// Output format: `json` or `pretty`.
    pub format: Option<String>,
    /// Log file; standard error when absent.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// Backend name.
    pub backend: Option<String>,
    /// Database path.
    pub path: Option<String>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl CatalogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory configuration, useful for tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default().with_backend(StorageBackendType::Memory)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location, then applies
    /// environment overrides.
    ///
    /// Reads `vercat/config.toml` under the platform config directory
    /// (`~/.config` on Linux). Falls back to defaults if no file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let from_file = directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("vercat").join("config.toml"))
            .filter(|path| path.exists())
            .and_then(|path| Self::load_from_file(&path).ok());

        from_file.unwrap_or_default().with_env_overrides()
    }

    /// Applies `VERCAT_STORAGE` and `VERCAT_DB_PATH` from the environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(backend) = lookup("VERCAT_STORAGE") {
            self.storage.backend = StorageBackendType::parse(&backend);
        }
        if let Some(path) = lookup("VERCAT_DB_PATH").filter(|p| !p.is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        self
    }

    /// Converts a `ConfigFile` to `CatalogConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(storage) = file.storage {
            if let Some(backend) = storage.backend {
                config.storage.backend = StorageBackendType::parse(&backend);
            }
            if let Some(path) = storage.path {
                config.storage.path = PathBuf::from(path);
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: StorageBackendType) -> Self {
        self.storage.backend = backend;
        self
    }

    /// Sets the `SQLite` database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.path = path.into();
        self
    }
}
