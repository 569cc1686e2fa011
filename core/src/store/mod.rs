//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The hub and the views call store methods; they never execute SQL.
//! Every write appends to `change_log` in the same transaction.

mod alert;
mod change;
mod metrics;

pub use alert::AckOutcome;

use crate::{
    error::{HubError, HubResult},
    event::ChangeKind,
    path::{CollectionPath, DocPath},
    types::{ChangeSeq, DocId},
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};

pub struct DocumentStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub path:    DocPath,
    pub id:      DocId,
    pub data:    Value,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field:      String,
    pub descending: bool,
}

/// A collection read: optional ordering on one top-level field and an
/// optional page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: CollectionPath,
    pub order_by:   Option<OrderBy>,
    pub limit:      Option<usize>,
}

impl CollectionQuery {
    pub fn all(collection: CollectionPath) -> Self {
        Self { collection, order_by: None, limit: None }
    }

    pub fn newest_first(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy { field: field.to_string(), descending: true });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Field names are spliced into JSON paths, so keep them plain.
fn json_field_path(field: &str) -> HubResult<String> {
    let valid = !field.is_empty()
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(HubError::InvalidField { field: field.to_string() });
    }
    Ok(format!("$.{field}"))
}

fn to_object<T: Serialize>(body: &T) -> HubResult<Map<String, Value>> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map),
        other => Err(HubError::Other(anyhow::anyhow!(
            "document body must be a JSON object, got {other}"
        ))),
    }
}

impl DocumentStore {
    pub fn open(path: &str) -> HubResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> HubResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file, which is how an
    /// external writer (the scoring process) shares the change feed.
    pub fn reopen(&self) -> HubResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> HubResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_documents.sql"))?;
        Ok(())
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Overwrite a document wholesale (create if missing).
    pub fn set_document<T: Serialize>(&self, path: &DocPath, body: &T) -> HubResult<ChangeSeq> {
        let data = Value::Object(to_object(body)?).to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO document (path, collection, doc_id, data, version)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(path) DO UPDATE SET data = excluded.data, version = version + 1",
            params![path.as_str(), path.parent().as_str(), path.id(), data],
        )?;
        let seq = Self::append_change(&tx, path, ChangeKind::Set)?;
        tx.commit()?;
        Ok(seq)
    }

    /// Shallow-merge top-level keys into a document (create if missing).
    pub fn merge_document<T: Serialize>(&self, path: &DocPath, body: &T) -> HubResult<ChangeSeq> {
        let patch = to_object(body)?;
        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT data FROM document WHERE path = ?1",
                params![path.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let mut merged = match existing {
            Some(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        merged.extend(patch);
        tx.execute(
            "INSERT INTO document (path, collection, doc_id, data, version)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(path) DO UPDATE SET data = excluded.data, version = version + 1",
            params![
                path.as_str(),
                path.parent().as_str(),
                path.id(),
                Value::Object(merged).to_string()
            ],
        )?;
        let seq = Self::append_change(&tx, path, ChangeKind::Update)?;
        tx.commit()?;
        Ok(seq)
    }

    /// Single-field partial update. Fails with `NotFound` when the
    /// document does not exist; never creates one.
    pub fn update_field(&self, path: &DocPath, field: &str, value: &Value) -> HubResult<ChangeSeq> {
        let json_path = json_field_path(field)?;
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE document SET data = json_set(data, ?2, json(?3)), version = version + 1
             WHERE path = ?1",
            params![path.as_str(), json_path, value.to_string()],
        )?;
        if changed == 0 {
            return Err(HubError::NotFound { path: path.to_string() });
        }
        let seq = Self::append_change(&tx, path, ChangeKind::Update)?;
        tx.commit()?;
        Ok(seq)
    }

    pub fn delete_document(&self, path: &DocPath) -> HubResult<Option<ChangeSeq>> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM document WHERE path = ?1", params![path.as_str()])?;
        if removed == 0 {
            return Ok(None);
        }
        let seq = Self::append_change(&tx, path, ChangeKind::Delete)?;
        tx.commit()?;
        Ok(Some(seq))
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn get_document(&self, path: &DocPath) -> HubResult<Option<StoredDocument>> {
        let row = self
            .conn
            .query_row(
                "SELECT doc_id, data, version FROM document WHERE path = ?1",
                params![path.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((id, data, version)) => Ok(Some(StoredDocument {
                path: path.clone(),
                id,
                data: serde_json::from_str(&data)?,
                version,
            })),
            None => Ok(None),
        }
    }

    pub fn document_exists(&self, path: &DocPath) -> HubResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM document WHERE path = ?1",
            params![path.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Read the direct members of a collection. Documents in nested
    /// sub-collections are never included.
    pub fn list_collection(&self, query: &CollectionQuery) -> HubResult<Vec<StoredDocument>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = query.limit.map(|n| n as i64).unwrap_or(-1);
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String, String, i64)> {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        };

        let rows = match &query.order_by {
            Some(order) => {
                let direction = if order.descending { "DESC" } else { "ASC" };
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT path, doc_id, data, version FROM document
                     WHERE collection = ?1
                     ORDER BY json_extract(data, ?2) {direction}, doc_id ASC
                     LIMIT ?3"
                ))?;
                let field = json_field_path(&order.field)?;
                let rows = stmt
                    .query_map(params![query.collection.as_str(), field, limit], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT path, doc_id, data, version FROM document
                     WHERE collection = ?1
                     ORDER BY doc_id ASC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![query.collection.as_str(), limit], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter()
            .map(|(path, id, data, version)| -> HubResult<StoredDocument> {
                Ok(StoredDocument {
                    path: DocPath::parse(&path)?,
                    id,
                    data: serde_json::from_str(&data)?,
                    version,
                })
            })
            .collect()
    }
}
