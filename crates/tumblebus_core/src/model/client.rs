//! Client domain model and its embedded sub-documents.
//!
//! # Invariants
//! - A client always carries exactly one `Parent` and one `PaymentMethod`
//!   (both may be zero-valued).
//! - `children` keeps enrollment order; `payments` keeps insertion order and
//!   is append-only.
//! - `school` references a School by id and is not a managed foreign key.

use super::id::DocumentId;
use super::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a client pays. Persisted as a small integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PaymentType {
    #[default]
    Cash = 0,
    Check = 1,
    CreditCard = 2,
    Other = 3,
}

/// Billing cadence. Persisted as a small integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PaymentFrequency {
    #[default]
    Weekly = 0,
    BiWeekly = 1,
    Monthly = 2,
    Quarterly = 3,
}

/// Raised when a persisted enum discriminant is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDiscriminant {
    pub kind: &'static str,
    pub value: u8,
}

impl Display for UnknownDiscriminant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} value `{}`", self.kind, self.value)
    }
}

impl Error for UnknownDiscriminant {}

impl From<PaymentType> for u8 {
    fn from(value: PaymentType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for PaymentType {
    type Error = UnknownDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cash),
            1 => Ok(Self::Check),
            2 => Ok(Self::CreditCard),
            3 => Ok(Self::Other),
            other => Err(UnknownDiscriminant {
                kind: "payment type",
                value: other,
            }),
        }
    }
}

impl From<PaymentFrequency> for u8 {
    fn from(value: PaymentFrequency) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for PaymentFrequency {
    type Error = UnknownDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Weekly),
            1 => Ok(Self::BiWeekly),
            2 => Ok(Self::Monthly),
            3 => Ok(Self::Quarterly),
            other => Err(UnknownDiscriminant {
                kind: "payment frequency",
                value: other,
            }),
        }
    }
}

/// Contact details of the parent who owns the client record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parent {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipcode")]
    pub zip_code: String,
    #[serde(rename = "homephone")]
    pub home_phone: String,
    #[serde(rename = "mobilephone")]
    pub mobile_phone: String,
    #[serde(rename = "emailaddress")]
    pub email_address: String,
}

impl Parent {
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }
}

/// An enrolled child. Dates of birth are calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub dob: NaiveDate,
    #[serde(default)]
    pub age: u32,
}

impl Child {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        dob: NaiveDate,
        age: u32,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            dob,
            age,
        }
    }
}

/// How a client intends to pay for a season.
///
/// Money is a `Decimal` persisted as an exact decimal string.
/// Card fields are meaningful only when `method == PaymentType::CreditCard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentMethod {
    pub method: PaymentType,
    pub frequency: PaymentFrequency,
    #[serde(rename = "unitcost")]
    pub unit_cost: Decimal,
    #[serde(rename = "startdate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "enddate")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "ccnumber")]
    pub cc_number: String,
    #[serde(rename = "expirationdate")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(rename = "securitycode")]
    pub security_code: String,
    #[serde(rename = "ccname")]
    pub cc_name: String,
}

impl PaymentMethod {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::EndBeforeStart {
                    field: "paymentmethod",
                });
            }
        }
        Ok(())
    }
}

/// One recorded payment. Immutable once appended to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentType,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
}

impl Payment {
    pub fn new(method: PaymentType, date: DateTime<Utc>, amount: Decimal) -> Self {
        Self {
            method,
            date,
            amount,
        }
    }
}

/// A family account: one parent, their children, payment plan and history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    /// Assigned by the store; `None` until the client has been persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub parent: Parent,
    pub children: Vec<Child>,
    #[serde(rename = "paymentmethod")]
    pub payment_method: PaymentMethod,
    pub payments: Vec<Payment>,
    /// Owning school id; `None` for clients created empty.
    #[serde(rename = "schoolid")]
    pub school: Option<DocumentId>,
}
