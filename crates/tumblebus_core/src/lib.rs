//! Data-access core for the TumbleBus activity-bus back office.
//!
//! Tracks schools, client families, enrolled children and payment history in
//! a document store, and exposes the query/update operations the HTTP layer
//! builds on.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::calendar::{month_start, one_month_window};
pub use model::client::{
    Child, Client, Parent, Payment, PaymentFrequency, PaymentMethod, PaymentType,
};
pub use model::id::{DocumentId, InvalidDocumentId};
pub use model::school::{School, Season};
pub use model::ValidationError;
pub use repo::client_repo::{ClientRepository, DocumentClientRepository};
pub use repo::school_repo::{DocumentSchoolRepository, SchoolRepository};
pub use repo::{RepoError, RepoResult};
pub use rust_decimal::Decimal;
pub use service::enrollment_service::{EnrollmentService, ParentForm, ServiceError};
pub use store::{CollectionHandle, Filter, ScopedHandles, StoreConnection, StoredDocument};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
