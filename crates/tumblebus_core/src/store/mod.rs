//! Document-store session management and collection primitives.
//!
//! # Responsibility
//! - Own the long-lived database session (`StoreConnection`).
//! - Hand out scoped, per-operation collection handles.
//! - Translate document operations (find, set, push, remove) into SQL over
//!   JSON bodies so repositories never write SQL themselves.
//!
//! # Invariants
//! - Handles are released on drop, on every exit path.
//! - Each mutation is a single statement, atomic at the document level.

mod collection;
mod connection;

pub use collection::{CollectionHandle, Filter, StoredDocument};
pub use connection::{ScopedHandles, StoreConnection};

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Shared session; handles hold clones and lock it per statement.
pub(crate) type Session = Arc<Mutex<Connection>>;
