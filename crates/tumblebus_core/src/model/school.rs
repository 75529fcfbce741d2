//! School domain model.
//!
//! # Invariants
//! - `name` is unique (case-sensitive) across the school collection.
//! - `seasons` is append-only; seasons are not separately addressable.

use super::id::DocumentId;
use super::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One per-year billing period with its running total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "yeartodatetotal", default)]
    pub year_to_date_total: Decimal,
}

impl Season {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            year_to_date_total: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart { field: "season" });
        }
        Ok(())
    }
}

/// School record with address and administrator contact details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct School {
    /// Assigned by the store; `None` until the school has been persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipcode")]
    pub zip_code: String,
    #[serde(rename = "mainphone")]
    pub main_phone: String,
    #[serde(rename = "contactname")]
    pub contact_name: String,
    pub url: String,
    pub seasons: Vec<Season>,
}

impl School {
    /// Creates an unsaved school with only its name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankSchoolName);
        }
        self.seasons.iter().try_for_each(Season::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::{School, Season};
    use crate::model::ValidationError;
    use chrono::{TimeZone, Utc};

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            School::named("  ").validate(),
            Err(ValidationError::BlankSchoolName)
        );
        assert!(School::named("Oakmont").validate().is_ok());
    }

    #[test]
    fn reversed_season_is_rejected() {
        let mut school = School::named("Oakmont");
        school.seasons.push(Season::new(
            Utc.with_ymd_and_hms(2016, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2015, 9, 1, 0, 0, 0).unwrap(),
        ));
        assert_eq!(
            school.validate(),
            Err(ValidationError::EndBeforeStart { field: "season" })
        );
    }

    #[test]
    fn storage_field_names_follow_document_contract() {
        let mut school = School::named("Holy Family");
        school.zip_code = "98310".to_string();
        school.main_phone = "978-234-1234".to_string();
        school.contact_name = "Sister Mary Francis".to_string();

        let value = serde_json::to_value(&school).unwrap();
        assert_eq!(value["zipcode"], "98310");
        assert_eq!(value["mainphone"], "978-234-1234");
        assert_eq!(value["contactname"], "Sister Mary Francis");
        assert!(value.get("id").is_none());
    }
}
