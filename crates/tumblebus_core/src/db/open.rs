//! Connection bootstrap for the SQLite document store.
//!
//! # Responsibility
//! - Open a file-backed or in-memory SQLite database.
//! - Apply the strong-consistency pragmas the store relies on.
//! - Optionally reset the dataset, then bring the schema up to date.
//!
//! # Invariants
//! - File databases run in WAL mode with `synchronous=FULL`.
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, reset_dataset};
use super::DbResult;
use log::warn;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database at `path` (or in memory when `None`) and migrates it.
///
/// # Side effects
/// - Creates the parent directory of `path` when missing.
/// - With `reset = true`, drops every stored document before migrating.
pub fn open_db(path: Option<&Path>, reset: bool) -> DbResult<Connection> {
    let mut conn = match path {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let conn = Connection::open(path)?;
            configure_durable(&conn)?;
            conn
        }
        None => Connection::open_in_memory()?,
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    if reset {
        warn!("event=dataset_reset module=db status=start");
        reset_dataset(&mut conn)?;
    } else {
        apply_migrations(&mut conn)?;
    }
    Ok(conn)
}

fn configure_durable(conn: &Connection) -> DbResult<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        warn!("event=db_configure module=db status=degraded journal_mode={mode}");
    }
    conn.pragma_update(None, "synchronous", "FULL")?;
    Ok(())
}
