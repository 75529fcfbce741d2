//! Repository layer over the document store.
//!
//! # Responsibility
//! - Define the School/Client capability traits callers depend on.
//! - Map domain values to documents and back.
//! - Translate store failures into the semantic taxonomy below.
//!
//! # Invariants
//! - Every operation acquires its own scoped handles and releases them
//!   before returning.
//! - Repositories never retry; failures surface to the caller (except the
//!   documented narrowing in `ClientRepository::client_exists`).

pub mod client_repo;
pub mod school_repo;

use crate::db::DbError;
use crate::model::school::School;
use crate::model::ValidationError;
use crate::store::StoredDocument;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error taxonomy.
#[derive(Debug)]
pub enum RepoError {
    /// No session could be established or acquired.
    Connection(DbError),
    /// Underlying read/write failure not otherwise classified.
    Store(DbError),
    /// Input rejected before it reached the store.
    Validation(ValidationError),
    /// No document matches the query.
    NotFound { entity: &'static str, key: String },
    /// The unique index on school names rejected the insert.
    DuplicateName(String),
    /// The school referenced by name does not exist.
    SchoolNotFound(String),
}

impl RepoError {
    pub(crate) fn client_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "client",
            key: key.into(),
        }
    }

    pub(crate) fn school_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "school",
            key: key.into(),
        }
    }

    /// True for `NotFound` and `SchoolNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SchoolNotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "store connection failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::DuplicateName(name) => {
                write!(f, "duplicate name exists for the school name `{name}`")
            }
            Self::SchoolNotFound(name) => write!(f, "unable to find school `{name}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } | Self::DuplicateName(_) | Self::SchoolNotFound(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_connection_failure() {
            Self::Connection(value)
        } else {
            Self::Store(value)
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Store(DbError::Document(value))
    }
}

pub(crate) fn decode_school(document: StoredDocument) -> RepoResult<School> {
    let mut school: School = document.decode()?;
    school.id = Some(document.id);
    Ok(school)
}
