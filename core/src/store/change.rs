//! Store methods for the change feed.

use super::DocumentStore;
use crate::{
    error::HubResult,
    event::{ChangeEvent, ChangeKind},
    path::DocPath,
    types::ChangeSeq,
};
use rusqlite::{params, Connection};

impl DocumentStore {
    /// Append one change entry. Called inside the write's transaction.
    pub(super) fn append_change(
        conn: &Connection,
        path: &DocPath,
        kind: ChangeKind,
    ) -> HubResult<ChangeSeq> {
        conn.execute(
            "INSERT INTO change_log (path, collection, kind) VALUES (?1, ?2, ?3)",
            params![path.as_str(), path.parent().as_str(), kind.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All changes with a sequence strictly greater than `after`, oldest first.
    pub fn changes_since(&self, after: ChangeSeq) -> HubResult<Vec<ChangeEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, path, collection, kind FROM change_log
             WHERE seq > ?1
             ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![after], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(seq, path, collection, kind)| {
                let kind = ChangeKind::parse(&kind)?;
                Some(ChangeEvent { seq, path, collection, kind })
            })
            .collect())
    }

    /// Highest sequence written so far, 0 on an empty log.
    pub fn latest_seq(&self) -> HubResult<ChangeSeq> {
        let seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM change_log",
            [],
            |row| row.get(0),
        )?;
        Ok(seq)
    }

    /// Number of change entries touching one document (for tests).
    pub fn change_count_for(&self, path: &DocPath) -> HubResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM change_log WHERE path = ?1",
            params![path.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
