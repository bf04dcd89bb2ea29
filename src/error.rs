// src/error.rs
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// A time label the codec could not turn into minutes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty time label")]
    Empty,
    #[error("time label {0:?} has no hour/minute separator")]
    MissingSeparator(String),
    #[error("time label {0:?} must have exactly two components")]
    ComponentCount(String),
    #[error("time label {0:?} has a non-numeric component")]
    NotNumeric(String),
    #[error("minute {minute} out of range in time label {label:?}")]
    MinuteOutOfRange { label: String, minute: u32 },
    #[error("hour overflows in time label {0:?}")]
    HourOverflow(String),
}

/// Failures reported by a page driver. All of them are recoverable from the
/// engine's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("page operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("page error: {0}")]
    Page(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A table or anchor file could not be written within the retry budget.
    /// The write was dropped; the file on disk is the previous version.
    #[error("write to {} dropped after {attempts} attempts: {source}", path.display())]
    PersistenceConflict {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unreadable table {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl Error {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Error::Io { path: path.to_path_buf(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
