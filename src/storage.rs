//! Location of tai's persistent files.
//!
//! Everything lives in one directory (default `~/.tai/`):
//! - `config.json` - user name and API key
//! - `lastquery.txt` - the most recently submitted query

use crate::error::{Result, TaiError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DIR_NAME: &str = ".tai";
const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "lastquery.txt";

/// The storage directory, passed explicitly to every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    dir: PathBuf,
}

impl StoragePath {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$HOME/.tai`.
    pub fn default_location() -> Result<Self> {
        dirs::home_dir()
            .map(|home| Self::new(home.join(DIR_NAME)))
            .ok_or(TaiError::HomeDirUnavailable)
    }

    /// Use `dir` when given, otherwise the default location.
    pub fn resolve(dir: Option<PathBuf>) -> Result<Self> {
        match dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Self::default_location(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn history_file(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }
}

/// Replace `path` with `contents` in one step.
///
/// The data goes to a temp file in the same directory which is then renamed
/// over `path`, so readers see either the old or the new file. On any error
/// the temp file is removed when it is dropped.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
