//! Error types for tai.
//!
//! Every failure a command can hit is a [`TaiError`]. Errors travel up to
//! `main`, which decides what the user sees and which exit code to use.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TaiError>;

/// How a failure affects the current command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged and skipped; the command carries on.
    BestEffort,
    /// Reported to the user; the command stops.
    Abort,
    /// The generation call failed; the process exits with an error.
    Fatal,
}

#[derive(Debug, Error)]
pub enum TaiError {
    /// No query text was given.
    #[error("You must provide a query with --query")]
    EmptyQuery,

    /// The tool has not been configured yet.
    #[error("Config file not found at {}. Run `tai configure -u <name> -k <key>` first", path.display())]
    ConfigNotFound { path: PathBuf },

    /// The config file exists but is not valid JSON.
    #[error("Error parsing config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No storage directory was given and no home directory could be found.
    #[error("Could not determine home directory for the default storage location")]
    HomeDirUnavailable,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error serializing config: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The previous query could not be read.
    #[error("Error reading conversation history {}: {source}", path.display())]
    HistoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The current query could not be stored as the last query.
    #[error("Error writing conversation history {}: {source}", path.display())]
    HistoryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A response fragment could not be written to the terminal.
    #[error("Error printing response: {0}")]
    Render(#[source] std::io::Error),

    /// The generation API call failed (auth, network, quota, ...).
    #[error("Generation request failed: {0:#}")]
    Generation(#[source] anyhow::Error),
}

impl TaiError {
    pub fn severity(&self) -> Severity {
        match self {
            TaiError::HistoryRead { .. } | TaiError::Render(_) => Severity::BestEffort,
            TaiError::Generation(_) => Severity::Fatal,
            TaiError::EmptyQuery
            | TaiError::ConfigNotFound { .. }
            | TaiError::ConfigParse { .. }
            | TaiError::HomeDirUnavailable
            | TaiError::Io { .. }
            | TaiError::Serialize(_)
            | TaiError::HistoryWrite { .. } => Severity::Abort,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            TaiError::EmptyQuery => 2,
            _ => 1,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaiError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn test_best_effort_kinds() {
        let read = TaiError::HistoryRead {
            path: "lastquery.txt".into(),
            source: io_error(),
        };
        assert_eq!(read.severity(), Severity::BestEffort);
        assert_eq!(TaiError::Render(io_error()).severity(), Severity::BestEffort);
    }

    #[test]
    fn test_history_write_aborts() {
        let write = TaiError::HistoryWrite {
            path: "lastquery.txt".into(),
            source: io_error(),
        };
        assert_eq!(write.severity(), Severity::Abort);
        assert_eq!(write.exit_code(), 1);
    }

    #[test]
    fn test_generation_is_fatal() {
        let err = TaiError::Generation(anyhow::anyhow!("quota exceeded"));
        assert_eq!(err.severity(), Severity::Fatal);
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_empty_query_exit_code() {
        assert_eq!(TaiError::EmptyQuery.exit_code(), 2);
        assert_eq!(TaiError::EmptyQuery.severity(), Severity::Abort);
    }
}
