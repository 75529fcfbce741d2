//! Connection manager for the document store.

use super::collection::CollectionHandle;
use super::Session;
use crate::config::StoreConfig;
use crate::db::{open_db, DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Long-lived session shared by all repository operations.
///
/// One instance is meant to be shared (by reference or `Arc`) across
/// concurrent callers; each operation acquires its own `ScopedHandles`.
pub struct StoreConnection {
    config: StoreConfig,
    session: Session,
}

/// Per-operation handles onto the two logical collections.
pub struct ScopedHandles {
    pub clients: CollectionHandle,
    pub schools: CollectionHandle,
}

impl StoreConnection {
    /// Opens the configured store and prepares it for use.
    ///
    /// # Side effects
    /// - Creates the database file and directory when missing.
    /// - With `reset_on_open`, erases all existing documents.
    /// - Ensures the unique index on school names.
    /// - Emits `store_open` logging events with duration and status.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = if config.data_dir.is_some() {
            "file"
        } else {
            "memory"
        };
        info!(
            "event=store_open module=store status=start mode={} reset={}",
            mode, config.reset_on_open
        );

        match bootstrap(config) {
            Ok(conn) => {
                info!(
                    "event=store_open module=store status=ok mode={} duration_ms={}",
                    mode,
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    config: config.clone(),
                    session: Arc::new(Mutex::new(conn)),
                })
            }
            Err(err) => {
                error!(
                    "event=store_open module=store status=error mode={} duration_ms={} error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns fresh client/school handles bound to the shared session.
    ///
    /// Fails with `SessionUnavailable` once the session has been poisoned.
    pub fn scoped_handles(&self) -> DbResult<ScopedHandles> {
        if self.session.is_poisoned() {
            error!("event=handles_acquire module=store status=error error=session_poisoned");
            return Err(DbError::SessionUnavailable);
        }
        debug!("event=handles_acquire module=store status=ok");
        Ok(ScopedHandles {
            clients: CollectionHandle::new(
                Arc::clone(&self.session),
                &self.config.client_collection,
            ),
            schools: CollectionHandle::new(
                Arc::clone(&self.session),
                &self.config.school_collection,
            ),
        })
    }

    /// Releases the master session. Outstanding handles keep it alive until
    /// they are dropped.
    pub fn close(self) {
        info!(
            "event=store_close module=store status=ok open_handles={}",
            Arc::strong_count(&self.session) - 1
        );
    }
}

fn bootstrap(config: &StoreConfig) -> DbResult<Connection> {
    config.validate()?;
    let path = config.database_path();
    let conn = open_db(path.as_deref(), config.reset_on_open)?;
    ensure_unique_school_name(&conn, &config.school_collection)?;
    Ok(conn)
}

// Collection names are validated identifiers, so they can be inlined into
// the partial index definition.
fn ensure_unique_school_name(conn: &Connection, school_collection: &str) -> DbResult<()> {
    conn.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{school_collection}_unique_name
             ON documents (json_extract(body, '$.name'))
             WHERE collection = '{school_collection}';"
    ))?;
    Ok(())
}
