//! SQLite bootstrap for the document store.
//!
//! # Responsibility
//! - Open and configure the SQLite database that backs every collection.
//! - Apply schema migrations in deterministic order.
//! - Classify low-level failures for the repository layer.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No document is read or written before migrations succeed.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::open_db;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Config(ConfigError),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The shared session was poisoned by a panic in another operation.
    SessionUnavailable,
    /// A document body could not be encoded or decoded.
    Document(serde_json::Error),
    /// A stored row violates the document table contract.
    CorruptDocument(String),
    InvalidPath(&'static str),
}

impl DbError {
    /// True when the failure means no usable session could be obtained.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Config(_)
                | Self::UnsupportedSchemaVersion { .. }
                | Self::SessionUnavailable
        ) || matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::NotADatabase
                        | rusqlite::ErrorCode::PermissionDenied
                )
        )
    }

    /// True when a unique index rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SessionUnavailable => write!(f, "no usable store session"),
            Self::Document(err) => write!(f, "document encoding failed: {err}"),
            Self::CorruptDocument(message) => write!(f, "corrupt document row: {message}"),
            Self::InvalidPath(path) => write!(f, "invalid document path `{path}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::SessionUnavailable
            | Self::CorruptDocument(_)
            | Self::InvalidPath(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(value: serde_json::Error) -> Self {
        Self::Document(value)
    }
}
