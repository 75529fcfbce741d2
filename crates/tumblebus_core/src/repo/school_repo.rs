//! School repository contract and document-store implementation.
//!
//! # Responsibility
//! - CRUD over School documents, addressed by their unique name.
//! - Report unique-name violations as `DuplicateName`.
//!
//! # Invariants
//! - Writes validate the school before touching the store.
//! - Update and delete resolve the id by name first; a missing name is
//!   `NotFound`.
//! - Deleting a school does not touch clients that reference it.

use super::{decode_school, RepoError, RepoResult};
use crate::model::id::DocumentId;
use crate::model::school::{School, Season};
use crate::store::{CollectionHandle, Filter, StoreConnection};
use log::info;
use serde_json::{Map, Value};

const NAME_PATH: &str = "$.name";
const SEASONS_PATH: &str = "$.seasons";

/// Repository interface for school operations.
pub trait SchoolRepository {
    /// Lists every school in insertion order.
    fn list_schools(&self) -> RepoResult<Vec<School>>;
    /// Exact, case-sensitive name lookup.
    fn find_school_by_name(&self, name: &str) -> RepoResult<School>;
    fn get_school_by_id(&self, id: &DocumentId) -> RepoResult<School>;
    /// Inserts a school and returns its new id.
    fn add_school(&self, school: &School) -> RepoResult<DocumentId>;
    /// Overwrites the contact fields of the school with the same name.
    fn update_school(&self, school: &School) -> RepoResult<()>;
    /// Removes the school with the same name.
    fn delete_school(&self, school: &School) -> RepoResult<()>;
    /// Appends a season to the named school.
    fn add_season(&self, school_name: &str, season: &Season) -> RepoResult<()>;
}

/// School repository backed by the shared document store.
pub struct DocumentSchoolRepository<'store> {
    store: &'store StoreConnection,
}

impl<'store> DocumentSchoolRepository<'store> {
    pub fn new(store: &'store StoreConnection) -> Self {
        Self { store }
    }

    fn schools(&self) -> RepoResult<CollectionHandle> {
        Ok(self.store.scoped_handles()?.schools)
    }
}

impl SchoolRepository for DocumentSchoolRepository<'_> {
    fn list_schools(&self) -> RepoResult<Vec<School>> {
        self.schools()?
            .find_all(&Filter::all())?
            .into_iter()
            .map(decode_school)
            .collect()
    }

    fn find_school_by_name(&self, name: &str) -> RepoResult<School> {
        let schools = self.schools()?;
        match schools.find_first(&by_name(name))? {
            Some(document) => decode_school(document),
            None => Err(RepoError::school_not_found(name)),
        }
    }

    fn get_school_by_id(&self, id: &DocumentId) -> RepoResult<School> {
        let schools = self.schools()?;
        match schools.find_by_id(id)? {
            Some(document) => decode_school(document),
            None => Err(RepoError::school_not_found(id.as_hex())),
        }
    }

    fn add_school(&self, school: &School) -> RepoResult<DocumentId> {
        school.validate()?;

        let mut body: Map<String, Value> = contact_fields(school)
            .into_iter()
            .map(|(path, value)| (path.trim_start_matches("$.").to_string(), value))
            .collect();
        body.insert("seasons".to_string(), serde_json::to_value(&school.seasons)?);

        let id = DocumentId::generate();
        match self.schools()?.insert(&id, &Value::Object(body)) {
            Ok(()) => {
                info!("event=school_add module=repo status=ok id={id}");
                Ok(id)
            }
            Err(err) if err.is_unique_violation() => {
                info!("event=school_add module=repo status=duplicate");
                Err(RepoError::DuplicateName(school.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_school(&self, school: &School) -> RepoResult<()> {
        school.validate()?;

        let schools = self.schools()?;
        let id = resolve_id(&schools, &school.name)?;
        if !schools.set_fields(&id, &contact_fields(school))? {
            return Err(RepoError::school_not_found(school.name.as_str()));
        }
        Ok(())
    }

    fn delete_school(&self, school: &School) -> RepoResult<()> {
        let schools = self.schools()?;
        let id = resolve_id(&schools, &school.name)?;
        if !schools.remove(&id)? {
            return Err(RepoError::school_not_found(school.name.as_str()));
        }
        info!("event=school_delete module=repo status=ok id={id}");
        Ok(())
    }

    fn add_season(&self, school_name: &str, season: &Season) -> RepoResult<()> {
        season.validate()?;

        let schools = self.schools()?;
        let id = resolve_id(&schools, school_name)?;
        if !schools.push(&id, SEASONS_PATH, &serde_json::to_value(season)?)? {
            return Err(RepoError::school_not_found(school_name));
        }
        Ok(())
    }
}

fn by_name(name: &str) -> Filter {
    Filter::all().field_eq(NAME_PATH, name)
}

fn resolve_id(schools: &CollectionHandle, name: &str) -> RepoResult<DocumentId> {
    schools
        .find_first(&by_name(name))?
        .map(|document| document.id)
        .ok_or_else(|| RepoError::school_not_found(name))
}

/// The mutable, non-list fields of a school document.
fn contact_fields(school: &School) -> [(&'static str, Value); 8] {
    [
        (NAME_PATH, Value::from(school.name.as_str())),
        ("$.address", Value::from(school.address.as_str())),
        ("$.city", Value::from(school.city.as_str())),
        ("$.state", Value::from(school.state.as_str())),
        ("$.zipcode", Value::from(school.zip_code.as_str())),
        ("$.mainphone", Value::from(school.main_phone.as_str())),
        ("$.contactname", Value::from(school.contact_name.as_str())),
        ("$.url", Value::from(school.url.as_str())),
    ]
}
