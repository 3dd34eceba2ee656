//! Configuration management for tai.
//!
//! Configuration is stored as JSON in `<storage dir>/config.json`.

use crate::error::{Result, TaiError};
use crate::storage::{self, StoragePath};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tracing::debug;

/// Stored user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name or nick for the user.
    #[serde(default)]
    pub username: String,
    /// API key for the generation service.
    #[serde(default)]
    pub key: String,
}

/// Fields supplied to `tai configure`. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub username: Option<String>,
    pub key: Option<String>,
}

impl Config {
    /// Overwrite the fields present in `update`.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(key) = update.key {
            self.key = key;
        }
    }
}

/// Outcome of [`ConfigStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    /// No record existed; a new one was written.
    Created(Config),
    /// An existing record was merged with the update.
    Updated(Config),
}

impl Saved {
    pub fn config(&self) -> &Config {
        match self {
            Saved::Created(config) | Saved::Updated(config) => config,
        }
    }
}

/// Reads and writes `config.json`.
pub struct ConfigStore {
    storage: StoragePath,
}

impl ConfigStore {
    pub fn new(storage: StoragePath) -> Self {
        Self { storage }
    }

    /// Load the stored record.
    pub fn load(&self) -> Result<Config> {
        let path = self.storage.config_file();
        let raw = self.get()?;
        serde_json::from_str(&raw).map_err(|source| TaiError::ConfigParse { path, source })
    }

    /// Raw file contents, exactly as stored.
    pub fn get(&self) -> Result<String> {
        let path = self.storage.config_file();
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TaiError::ConfigNotFound { path }),
            Err(e) => Err(TaiError::io(path, e)),
        }
    }

    /// Merge `update` into the stored record, creating it (and the storage
    /// directory) when missing.
    pub fn save(&self, update: ConfigUpdate) -> Result<Saved> {
        let (mut config, existed) = match self.load() {
            Ok(config) => (config, true),
            Err(TaiError::ConfigNotFound { .. }) => (Config::default(), false),
            Err(e) => return Err(e),
        };
        config.apply(update);

        let path = self.storage.config_file();
        let contents = serde_json::to_vec(&config).map_err(TaiError::Serialize)?;
        storage::write_atomic(&path, &contents).map_err(|e| TaiError::io(&path, e))?;
        debug!("Config written to {}", path.display());

        Ok(if existed {
            Saved::Updated(config)
        } else {
            Saved::Created(config)
        })
    }
}
