//! The last submitted query, kept in `lastquery.txt`.

use crate::error::{Result, TaiError};
use crate::storage::{self, StoragePath};
use std::io::ErrorKind;

pub struct HistoryStore {
    storage: StoragePath,
}

impl HistoryStore {
    pub fn new(storage: StoragePath) -> Self {
        Self { storage }
    }

    /// The previous query, or `None` on the first run.
    pub fn last_query(&self) -> Result<Option<String>> {
        let path = self.storage.history_file();
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TaiError::HistoryRead { path, source }),
        }
    }

    pub fn save_last_query(&self, query: &str) -> Result<()> {
        let path = self.storage.history_file();
        storage::write_atomic(&path, query.as_bytes())
            .map_err(|source| TaiError::HistoryWrite { path, source })
    }
}

/// Prefix `query` with the previous one, newline separated.
pub fn chain(previous: &str, query: &str) -> String {
    format!("{previous}\n{query}")
}
