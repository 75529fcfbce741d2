//! Runtime configuration for the connection manager.
//!
//! # Responsibility
//! - Describe where the document store lives and how its collections are named.
//! - Load overrides from the process environment.
//!
//! # Invariants
//! - Database and collection names match `[A-Za-z_][A-Za-z0-9_]*`.
//! - Client and school collections are distinct.
//! - Destructive reset is never enabled by default.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DATA_DIR: &str = "TUMBLEBUS_DATA_DIR";
pub const ENV_DATABASE: &str = "TUMBLEBUS_DATABASE";
pub const ENV_CLIENT_COLLECTION: &str = "TUMBLEBUS_CLIENT_COLLECTION";
pub const ENV_SCHOOL_COLLECTION: &str = "TUMBLEBUS_SCHOOL_COLLECTION";
pub const ENV_RESET_ON_OPEN: &str = "TUMBLEBUS_RESET_ON_OPEN";

const DEFAULT_DATABASE: &str = "tumblebus";
const DEFAULT_CLIENT_COLLECTION: &str = "clients";
const DEFAULT_SCHOOL_COLLECTION: &str = "schools";
const DATABASE_FILE_EXTENSION: &str = "sqlite3";

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name regex"));

/// Invalid runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidName { setting: &'static str, value: String },
    DuplicateCollections(String),
    InvalidFlag { setting: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { setting, value } => write!(
                f,
                "invalid {setting} `{value}`; expected letters, digits and underscores"
            ),
            Self::DuplicateCollections(name) => write!(
                f,
                "client and school collections must differ, both are `{name}`"
            ),
            Self::InvalidFlag { setting, value } => {
                write!(f, "invalid {setting} `{value}`; expected true|false|1|0")
            }
        }
    }
}

impl Error for ConfigError {}

/// Connection manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the database file. `None` keeps the dataset in memory.
    pub data_dir: Option<PathBuf>,
    /// Dataset name; the file is `<data_dir>/<database_name>.sqlite3`.
    pub database_name: String,
    pub client_collection: String,
    pub school_collection: String,
    /// Drop and recreate the dataset on open. Erases all existing data.
    pub reset_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_name: DEFAULT_DATABASE.to_string(),
            client_collection: DEFAULT_CLIENT_COLLECTION.to_string(),
            school_collection: DEFAULT_SCHOOL_COLLECTION.to_string(),
            reset_on_open: false,
        }
    }
}

impl StoreConfig {
    /// In-memory store with default collection names.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store under `data_dir` with default names.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(dir) = read(ENV_DATA_DIR) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = read(ENV_DATABASE) {
            config.database_name = name;
        }
        if let Some(name) = read(ENV_CLIENT_COLLECTION) {
            config.client_collection = name;
        }
        if let Some(name) = read(ENV_SCHOOL_COLLECTION) {
            config.school_collection = name;
        }
        if let Some(flag) = read(ENV_RESET_ON_OPEN) {
            config.reset_on_open = parse_flag(ENV_RESET_ON_OPEN, &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name("database name", &self.database_name)?;
        check_name("client collection", &self.client_collection)?;
        check_name("school collection", &self.school_collection)?;
        if self.client_collection == self.school_collection {
            return Err(ConfigError::DuplicateCollections(
                self.client_collection.clone(),
            ));
        }
        Ok(())
    }

    /// Database file path, or `None` for an in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| {
            dir.join(format!(
                "{}.{DATABASE_FILE_EXTENSION}",
                self.database_name
            ))
        })
    }
}

fn check_name(setting: &'static str, value: &str) -> Result<(), ConfigError> {
    if NAME_PATTERN.is_match(value) {
        return Ok(());
    }
    Err(ConfigError::InvalidName {
        setting,
        value: value.to_string(),
    })
}

fn parse_flag(setting: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            setting,
            value: value.to_string(),
        }),
    }
}
