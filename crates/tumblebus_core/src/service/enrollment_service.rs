//! Parent registration and birthday lookups.
//!
//! # Invariants
//! - `register_parent` runs lookup → create → attach parent under one lock,
//!   so concurrent registrations through the same service never create two
//!   clients for one parent name.
//! - Service APIs never bypass repository contracts.

use crate::model::calendar::month_start;
use crate::model::client::{Client, Parent};
use crate::model::id::DocumentId;
use crate::repo::client_repo::ClientRepository;
use crate::repo::RepoError;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// Body of a parent registration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentForm {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipcode")]
    pub zip_code: String,
    #[serde(rename = "mobilephone")]
    pub mobile_phone: String,
    #[serde(rename = "homephone")]
    pub home_phone: String,
    pub email: String,
}

impl ParentForm {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "parent first and last name are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_parent(&self) -> Parent {
        Parent {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            home_phone: self.home_phone.clone(),
            mobile_phone: self.mobile_phone.clone(),
            email_address: self.email.clone(),
        }
    }
}

/// Errors from enrollment use-cases.
#[derive(Debug)]
pub enum ServiceError {
    InvalidInput(String),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Enrollment use-cases over a client repository.
pub struct EnrollmentService<C: ClientRepository> {
    clients: C,
    registration: Mutex<()>,
}

impl<C: ClientRepository> EnrollmentService<C> {
    pub fn new(clients: C) -> Self {
        Self {
            clients,
            registration: Mutex::new(()),
        }
    }

    pub fn clients(&self) -> &C {
        &self.clients
    }

    /// Creates or refreshes the client owned by the parent in `form`.
    ///
    /// # Contract
    /// - Reuses the existing client when one matches the parent's name,
    ///   otherwise creates an empty client first.
    /// - Replaces the parent sub-document with the form contents.
    /// - Returns the client id.
    pub fn register_parent(&self, form: &ParentForm) -> Result<DocumentId, ServiceError> {
        form.validate()?;
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (client_id, created) = match self
            .clients
            .get_client_id(&form.first_name, &form.last_name)
        {
            Ok(id) => (id, false),
            Err(err) if err.is_not_found() => (self.clients.create_empty_client()?, true),
            Err(err) => return Err(err.into()),
        };
        self.clients.add_parent(&client_id, &form.to_parent())?;

        info!("event=parent_register module=service status=ok id={client_id} created={created}");
        Ok(client_id)
    }

    /// Clients with a child born in the given calendar month.
    pub fn birthday_clients(&self, year: i32, month: u32) -> Result<Vec<Client>, ServiceError> {
        let start = month_start(year, month).ok_or_else(|| {
            ServiceError::InvalidInput(format!("invalid birth month {year}-{month:02}"))
        })?;
        Ok(self.clients.find_clients_by_birth_month(start)?)
    }
}
