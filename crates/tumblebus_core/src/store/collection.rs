//! Scoped collection handle and document filters.

use super::Session;
use crate::db::{DbError, DbResult};
use crate::model::id::DocumentId;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;

const TOUCH_UPDATED_AT: &str = "updated_at = (strftime('%s', 'now') * 1000)";

/// A stored document: its id plus the JSON body without the id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub body: Value,
}

impl StoredDocument {
    /// Decodes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<T> {
        Ok(T::deserialize(&self.body)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Id(DocumentId),
    FieldEq {
        path: &'static str,
        value: String,
    },
    AnyElementInRange {
        array: &'static str,
        field: &'static str,
        lower: String,
        upper: String,
    },
}

/// Conjunction of match clauses over a collection.
///
/// Paths are JSON paths such as `$.parent.firstname`. They are compiled into
/// the SQL text (so expression indexes apply) and must be static.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Matches every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &DocumentId) -> Self {
        Self {
            clauses: vec![Clause::Id(id.clone())],
        }
    }

    /// String equality on the value at `path`.
    pub fn field_eq(mut self, path: &'static str, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::FieldEq {
            path,
            value: value.into(),
        });
        self
    }

    /// At least one element of the array at `array` has `field` in
    /// `[lower, upper)`, compared as text.
    pub fn any_element_in_range(
        mut self,
        array: &'static str,
        field: &'static str,
        lower: impl Into<String>,
        upper: impl Into<String>,
    ) -> Self {
        self.clauses.push(Clause::AnyElementInRange {
            array,
            field,
            lower: lower.into(),
            upper: upper.into(),
        });
        self
    }

    fn to_sql(&self, collection: &str) -> DbResult<(String, Vec<SqlValue>)> {
        let mut sql = String::from("collection = ?");
        let mut binds = vec![SqlValue::Text(collection.to_string())];

        for clause in &self.clauses {
            match clause {
                Clause::Id(id) => {
                    sql.push_str(" AND doc_id = ?");
                    binds.push(SqlValue::Text(id.as_hex().to_string()));
                }
                Clause::FieldEq { path, value } => {
                    let path = checked_path(path)?;
                    sql.push_str(&format!(" AND json_extract(body, '{path}') = ?"));
                    binds.push(SqlValue::Text(value.clone()));
                }
                Clause::AnyElementInRange {
                    array,
                    field,
                    lower,
                    upper,
                } => {
                    let array = checked_path(array)?;
                    let field = checked_path(field)?;
                    sql.push_str(&format!(
                        " AND EXISTS (
                            SELECT 1 FROM json_each(documents.body, '{array}') AS element
                            WHERE json_extract(element.value, '{field}') >= ?
                              AND json_extract(element.value, '{field}') < ?
                        )"
                    ));
                    binds.push(SqlValue::Text(lower.clone()));
                    binds.push(SqlValue::Text(upper.clone()));
                }
            }
        }

        Ok((sql, binds))
    }
}

/// Per-operation handle onto one named collection.
///
/// Holds a clone of the shared session; dropping the handle releases it.
pub struct CollectionHandle {
    session: Session,
    collection: String,
}

impl CollectionHandle {
    pub(crate) fn new(session: Session, collection: &str) -> Self {
        Self {
            session,
            collection: collection.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.collection
    }

    /// Inserts a new document under `id`.
    pub fn insert(&self, id: &DocumentId, body: &Value) -> DbResult<()> {
        let text = serde_json::to_string(body)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, json(?3));",
                params![self.collection, id.as_hex(), text],
            )?;
            Ok(())
        })
    }

    pub fn find_by_id(&self, id: &DocumentId) -> DbResult<Option<StoredDocument>> {
        self.find_first(&Filter::by_id(id))
    }

    /// Returns the earliest-inserted matching document.
    pub fn find_first(&self, filter: &Filter) -> DbResult<Option<StoredDocument>> {
        let (where_sql, binds) = filter.to_sql(&self.collection)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT doc_id, body FROM documents WHERE {where_sql} ORDER BY seq ASC LIMIT 1;"
            ))?;
            let row = stmt
                .query_row(params_from_iter(binds), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .optional()?;
            row.map(|(id, body)| parse_document(&id, &body)).transpose()
        })
    }

    /// Returns every matching document in insertion order.
    pub fn find_all(&self, filter: &Filter) -> DbResult<Vec<StoredDocument>> {
        let (where_sql, binds) = filter.to_sql(&self.collection)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT doc_id, body FROM documents WHERE {where_sql} ORDER BY seq ASC;"
            ))?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                documents.push(parse_row(row)?);
            }
            Ok(documents)
        })
    }

    /// Replaces the values at each path of one document.
    ///
    /// Returns `false` when no document has `id`.
    pub fn set_fields(&self, id: &DocumentId, fields: &[(&'static str, Value)]) -> DbResult<bool> {
        if fields.is_empty() {
            return Ok(self.find_by_id(id)?.is_some());
        }

        let mut assignments = Vec::with_capacity(fields.len());
        let mut binds = Vec::with_capacity(fields.len() + 2);
        for (path, value) in fields {
            let path = checked_path(path)?;
            assignments.push(format!("'{path}', json(?)"));
            binds.push(SqlValue::Text(serde_json::to_string(value)?));
        }
        binds.push(SqlValue::Text(self.collection.clone()));
        binds.push(SqlValue::Text(id.as_hex().to_string()));

        let sql = format!(
            "UPDATE documents
             SET body = json_set(body, {}), {TOUCH_UPDATED_AT}
             WHERE collection = ? AND doc_id = ?;",
            assignments.join(", ")
        );
        self.with_conn(|conn| Ok(conn.execute(&sql, params_from_iter(binds))? > 0))
    }

    /// Appends `value` to the array at `array` in a single statement.
    ///
    /// Returns `false` when no document has `id`.
    pub fn push(&self, id: &DocumentId, array: &'static str, value: &Value) -> DbResult<bool> {
        let array = checked_path(array)?;
        let text = serde_json::to_string(value)?;
        let sql = format!(
            "UPDATE documents
             SET body = json_insert(body, '{array}[#]', json(?1)), {TOUCH_UPDATED_AT}
             WHERE collection = ?2 AND doc_id = ?3;"
        );
        self.with_conn(|conn| {
            Ok(conn.execute(&sql, params![text, self.collection, id.as_hex()])? > 0)
        })
    }

    /// Removes one document. Returns `false` when no document has `id`.
    pub fn remove(&self, id: &DocumentId) -> DbResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![self.collection, id.as_hex()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn count(&self) -> DbResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1;",
                [&self.collection],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self
            .session
            .lock()
            .map_err(|_| DbError::SessionUnavailable)?;
        op(&conn)
    }
}

impl Drop for CollectionHandle {
    fn drop(&mut self) {
        debug!(
            "event=handle_release module=store collection={}",
            self.collection
        );
    }
}

fn parse_row(row: &Row<'_>) -> DbResult<StoredDocument> {
    let id: String = row.get(0)?;
    let body: String = row.get(1)?;
    parse_document(&id, &body)
}

fn parse_document(id: &str, body: &str) -> DbResult<StoredDocument> {
    let id = DocumentId::parse_hex(id)
        .map_err(|err| DbError::CorruptDocument(format!("documents.doc_id: {err}")))?;
    let body = serde_json::from_str(body)?;
    Ok(StoredDocument { id, body })
}

fn checked_path(path: &'static str) -> DbResult<&'static str> {
    let valid = path.starts_with('$')
        && path
            .chars()
            .skip(1)
            .all(|ch| ch == '.' || ch == '_' || ch.is_ascii_alphanumeric());
    if valid {
        Ok(path)
    } else {
        Err(DbError::InvalidPath(path))
    }
}
