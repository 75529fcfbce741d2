//! Domain model shared by repositories and external callers.
//!
//! # Responsibility
//! - Define School/Client entities and their embedded sub-documents.
//! - Own the persisted field names (serde renames are the storage contract).
//!
//! # Invariants
//! - Every top-level document is identified by a store-assigned `DocumentId`.
//! - Sub-documents (Parent, Child, PaymentMethod, Payment, Season) have no
//!   identity of their own.

pub mod calendar;
pub mod client;
pub mod id;
pub mod school;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Domain-level validation failures raised before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// School name is empty or whitespace only.
    BlankSchoolName,
    /// A season or payment plan ends before it starts.
    EndBeforeStart { field: &'static str },
    /// Date arithmetic left the supported calendar range.
    DateOutOfRange { field: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankSchoolName => write!(f, "school name cannot be blank"),
            Self::EndBeforeStart { field } => {
                write!(f, "`{field}` end must not be earlier than its start")
            }
            Self::DateOutOfRange { field } => write!(f, "`{field}` is outside the calendar range"),
        }
    }
}

impl Error for ValidationError {}
