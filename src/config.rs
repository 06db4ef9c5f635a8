//! Runtime configuration: which storage backend holds progress, where it
//! lives, and an optional external catalogue.
//!
//! Read from TOML at `SPRACHTAGE_CONFIG`, or `<config dir>/sprachtage/config.toml`
//! when that file exists. Environment variables override the file:
//!
//!   SPRACHTAGE_DB        : SQLite database path
//!   SPRACHTAGE_STORE     : "sqlite" (default), "file" or "memory"
//!   SPRACHTAGE_CATALOGUE : path to a catalogue JSON replacing the built-in one
//!
//! Example:
//!
//! ```toml
//! store = "file"
//! data_dir = "/home/anna/.sprachtage"
//! progress_key = "anna"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::progress::PROGRESS_KEY;

const DEFAULT_DB_NAME: &str = "sprachtage.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::File => "file",
            StoreBackend::Memory => "memory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Some(StoreBackend::Sqlite),
            "file" | "json" => Some(StoreBackend::File),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreBackend,
    pub data_dir: PathBuf,
    /// SQLite file; defaults to `<data_dir>/sprachtage.db`
    pub database: Option<PathBuf>,
    pub catalogue: Option<PathBuf>,
    pub progress_key: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sprachtage");

        Self {
            store: StoreBackend::default(),
            data_dir,
            database: None,
            catalogue: None,
            progress_key: PROGRESS_KEY.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SPRACHTAGE_CONFIG") {
            Ok(path) => Self::from_path(&path)?,
            Err(_) => match default_config_path() {
                Some(path) if path.exists() => Self::from_path(&path)?,
                _ => {
                    debug!("No config file; using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<Config>(&s).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), store = config.store.as_str(), "Loaded config (TOML)");
        Ok(config)
    }

    /// Apply `SPRACHTAGE_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("SPRACHTAGE_DB") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(store) = lookup("SPRACHTAGE_STORE") {
            self.store =
                StoreBackend::from_str(&store).ok_or(ConfigError::UnknownBackend(store))?;
        }
        if let Some(catalogue) = lookup("SPRACHTAGE_CATALOGUE") {
            self.catalogue = Some(PathBuf::from(catalogue));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_DB_NAME))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sprachtage").join("config.toml"))
}
