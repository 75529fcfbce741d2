//! Opaque document identifiers.
//!
//! Identifiers are assigned by the store at insert time and travel as
//! 32-character lowercase hex strings (the same form is used for the
//! `schoolid` reference inside client documents).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const ID_HEX_LEN: usize = 32;

/// Store-assigned identifier of a School or Client document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Allocates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses the hex form, accepting either letter case.
    pub fn parse_hex(value: &str) -> Result<Self, InvalidDocumentId> {
        let trimmed = value.trim();
        if trimmed.len() != ID_HEX_LEN || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(InvalidDocumentId(value.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidDocumentId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(value)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidDocumentId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

/// Raised when a string is not a valid hex document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDocumentId(pub String);

impl Display for InvalidDocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid document id `{}`; expected {ID_HEX_LEN} hex characters",
            self.0
        )
    }
}

impl Error for InvalidDocumentId {}
