//! Client repository contract and document-store implementation.
//!
//! # Responsibility
//! - Create, look up and mutate Client documents and their embedded
//!   parent, children, payment method and payment history.
//!
//! # Invariants
//! - Parent-name lookups match first and last name exactly.
//! - `add_payment` is a single atomic append; payments are never edited.
//! - `add_parent` and `update_payment_method` replace their sub-document
//!   wholesale.
//! - Clients reference their school by hex id; school lookups by name fail
//!   with `SchoolNotFound`.

use super::{RepoError, RepoResult};
use crate::model::calendar::one_month_window;
use crate::model::client::{Child, Client, Parent, Payment, PaymentMethod};
use crate::model::id::DocumentId;
use crate::model::ValidationError;
use crate::store::{CollectionHandle, Filter, ScopedHandles, StoreConnection, StoredDocument};
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::{json, Value};

const NAME_PATH: &str = "$.name";
const PARENT_PATH: &str = "$.parent";
const PARENT_FIRST_NAME_PATH: &str = "$.parent.firstname";
const PARENT_LAST_NAME_PATH: &str = "$.parent.lastname";
const CHILDREN_PATH: &str = "$.children";
const CHILD_DOB_PATH: &str = "$.dob";
const PAYMENT_METHOD_PATH: &str = "$.paymentmethod";
const PAYMENTS_PATH: &str = "$.payments";
const SCHOOL_REF_PATH: &str = "$.schoolid";

/// Repository interface for client operations.
pub trait ClientRepository {
    /// Returns the id of the client whose parent has exactly this name.
    ///
    /// Lookup failures are logged and reported as `None`; use
    /// `get_client_id` when the caller must tell errors from absence.
    fn client_exists(&self, first_name: &str, last_name: &str) -> Option<DocumentId>;
    /// Inserts a zero-valued client and returns its id.
    fn create_empty_client(&self) -> RepoResult<DocumentId>;
    /// Replaces the parent sub-document of one client.
    fn add_parent(&self, client_id: &DocumentId, parent: &Parent) -> RepoResult<()>;
    /// Inserts a fully formed client attached to the named school.
    fn add_client(
        &self,
        school_name: &str,
        parent: &Parent,
        children: &[Child],
        payment_method: &PaymentMethod,
    ) -> RepoResult<DocumentId>;
    fn list_clients(&self) -> RepoResult<Vec<Client>>;
    fn get_client_id(&self, first_name: &str, last_name: &str) -> RepoResult<DocumentId>;
    fn get_client_by_id(&self, client_id: &DocumentId) -> RepoResult<Client>;
    fn find_client_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<Client>;
    fn find_clients_by_school(&self, school_name: &str) -> RepoResult<Vec<Client>>;
    /// Clients with at least one child born in `[start, start + 1 month)`.
    ///
    /// The window end keeps the day of month and rolls past short months
    /// (`2001-01-31` ends before `2001-03-03`). Use `month_start` for whole
    /// calendar months.
    fn find_clients_by_birth_month(&self, start: NaiveDate) -> RepoResult<Vec<Client>>;
    fn update_payment_method(
        &self,
        client_id: &DocumentId,
        payment_method: &PaymentMethod,
    ) -> RepoResult<()>;
    fn add_payment(&self, client_id: &DocumentId, payment: &Payment) -> RepoResult<()>;
    /// Replaces parent, children, payment method and school reference.
    fn update_client(&self, client: &Client) -> RepoResult<()>;
    fn delete_client(&self, client: &Client) -> RepoResult<()>;
}

/// Client repository backed by the shared document store.
pub struct DocumentClientRepository<'store> {
    store: &'store StoreConnection,
}

impl<'store> DocumentClientRepository<'store> {
    pub fn new(store: &'store StoreConnection) -> Self {
        Self { store }
    }

    fn handles(&self) -> RepoResult<ScopedHandles> {
        Ok(self.store.scoped_handles()?)
    }

    fn clients(&self) -> RepoResult<CollectionHandle> {
        Ok(self.handles()?.clients)
    }

    fn resolve_id(&self, client: &Client) -> RepoResult<DocumentId> {
        match &client.id {
            Some(id) => Ok(id.clone()),
            None => self.get_client_id(&client.parent.first_name, &client.parent.last_name),
        }
    }
}

impl ClientRepository for DocumentClientRepository<'_> {
    fn client_exists(&self, first_name: &str, last_name: &str) -> Option<DocumentId> {
        match self.get_client_id(first_name, last_name) {
            Ok(id) => Some(id),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                warn!("event=client_exists module=repo status=error error={err}");
                None
            }
        }
    }

    fn create_empty_client(&self) -> RepoResult<DocumentId> {
        let id = DocumentId::generate();
        let body = client_document(
            &Parent::default(),
            &[],
            &PaymentMethod::default(),
            &[],
            None,
        )?;
        self.clients()?.insert(&id, &body)?;
        info!("event=client_create module=repo status=ok id={id} kind=empty");
        Ok(id)
    }

    fn add_parent(&self, client_id: &DocumentId, parent: &Parent) -> RepoResult<()> {
        let fields = [(PARENT_PATH, serde_json::to_value(parent)?)];
        if !self.clients()?.set_fields(client_id, &fields)? {
            return Err(RepoError::client_not_found(client_id.as_hex()));
        }
        Ok(())
    }

    fn add_client(
        &self,
        school_name: &str,
        parent: &Parent,
        children: &[Child],
        payment_method: &PaymentMethod,
    ) -> RepoResult<DocumentId> {
        payment_method.validate()?;

        let handles = self.handles()?;
        let school_id = find_school_id(&handles.schools, school_name)?;
        let body = client_document(parent, children, payment_method, &[], Some(&school_id))?;

        let id = DocumentId::generate();
        handles.clients.insert(&id, &body)?;
        info!(
            "event=client_create module=repo status=ok id={id} kind=full children={}",
            children.len()
        );
        Ok(id)
    }

    fn list_clients(&self) -> RepoResult<Vec<Client>> {
        decode_clients(self.clients()?.find_all(&Filter::all())?)
    }

    fn get_client_id(&self, first_name: &str, last_name: &str) -> RepoResult<DocumentId> {
        let filter = Filter::all()
            .field_eq(PARENT_FIRST_NAME_PATH, first_name)
            .field_eq(PARENT_LAST_NAME_PATH, last_name);
        self.clients()?
            .find_first(&filter)?
            .map(|document| document.id)
            .ok_or_else(|| RepoError::client_not_found(format!("{first_name} {last_name}")))
    }

    fn get_client_by_id(&self, client_id: &DocumentId) -> RepoResult<Client> {
        match self.clients()?.find_by_id(client_id)? {
            Some(document) => decode_client(document),
            None => Err(RepoError::client_not_found(client_id.as_hex())),
        }
    }

    fn find_client_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<Client> {
        let id = self.get_client_id(first_name, last_name)?;
        self.get_client_by_id(&id)
    }

    fn find_clients_by_school(&self, school_name: &str) -> RepoResult<Vec<Client>> {
        let handles = self.handles()?;
        let school_id = find_school_id(&handles.schools, school_name)?;
        let filter = Filter::all().field_eq(SCHOOL_REF_PATH, school_id.as_hex());
        decode_clients(handles.clients.find_all(&filter)?)
    }

    fn find_clients_by_birth_month(&self, start: NaiveDate) -> RepoResult<Vec<Client>> {
        let (lower, upper) =
            one_month_window(start).ok_or(ValidationError::DateOutOfRange { field: "dob" })?;
        let filter = Filter::all().any_element_in_range(
            CHILDREN_PATH,
            CHILD_DOB_PATH,
            lower.to_string(),
            upper.to_string(),
        );
        decode_clients(self.clients()?.find_all(&filter)?)
    }

    fn update_payment_method(
        &self,
        client_id: &DocumentId,
        payment_method: &PaymentMethod,
    ) -> RepoResult<()> {
        payment_method.validate()?;

        let fields = [(PAYMENT_METHOD_PATH, serde_json::to_value(payment_method)?)];
        if !self.clients()?.set_fields(client_id, &fields)? {
            return Err(RepoError::client_not_found(client_id.as_hex()));
        }
        Ok(())
    }

    fn add_payment(&self, client_id: &DocumentId, payment: &Payment) -> RepoResult<()> {
        let value = serde_json::to_value(payment)?;
        if !self.clients()?.push(client_id, PAYMENTS_PATH, &value)? {
            return Err(RepoError::client_not_found(client_id.as_hex()));
        }
        Ok(())
    }

    fn update_client(&self, client: &Client) -> RepoResult<()> {
        client.payment_method.validate()?;

        let id = self.resolve_id(client)?;
        let fields = [
            (PARENT_PATH, serde_json::to_value(&client.parent)?),
            (CHILDREN_PATH, serde_json::to_value(&client.children)?),
            (
                PAYMENT_METHOD_PATH,
                serde_json::to_value(&client.payment_method)?,
            ),
            (SCHOOL_REF_PATH, serde_json::to_value(&client.school)?),
        ];
        if !self.clients()?.set_fields(&id, &fields)? {
            return Err(RepoError::client_not_found(id.as_hex()));
        }
        Ok(())
    }

    fn delete_client(&self, client: &Client) -> RepoResult<()> {
        let id = self.resolve_id(client)?;
        if !self.clients()?.remove(&id)? {
            return Err(RepoError::client_not_found(id.as_hex()));
        }
        info!("event=client_delete module=repo status=ok id={id}");
        Ok(())
    }
}

fn find_school_id(schools: &CollectionHandle, school_name: &str) -> RepoResult<DocumentId> {
    schools
        .find_first(&Filter::all().field_eq(NAME_PATH, school_name))?
        .map(|document| document.id)
        .ok_or_else(|| {
            warn!("event=school_lookup module=repo status=not_found");
            RepoError::SchoolNotFound(school_name.to_string())
        })
}

fn client_document(
    parent: &Parent,
    children: &[Child],
    payment_method: &PaymentMethod,
    payments: &[Payment],
    school: Option<&DocumentId>,
) -> RepoResult<Value> {
    let parent = serde_json::to_value(parent)?;
    let children = serde_json::to_value(children)?;
    let payment_method = serde_json::to_value(payment_method)?;
    let payments = serde_json::to_value(payments)?;
    Ok(json!({
        "parent": parent,
        "children": children,
        "paymentmethod": payment_method,
        "payments": payments,
        "schoolid": school.map(DocumentId::as_hex),
    }))
}

fn decode_client(document: StoredDocument) -> RepoResult<Client> {
    let mut client: Client = document.decode()?;
    client.id = Some(document.id);
    Ok(client)
}

fn decode_clients(documents: Vec<StoredDocument>) -> RepoResult<Vec<Client>> {
    documents.into_iter().map(decode_client).collect()
}
