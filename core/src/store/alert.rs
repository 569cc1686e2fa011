//! Store methods for alert acknowledgement.

use super::DocumentStore;
use crate::{
    error::{HubError, HubResult},
    event::ChangeKind,
    path::DocPath,
};
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckOutcome {
    Acknowledged,
    /// The flag was already true. Nothing was written.
    AlreadyAcknowledged,
}

impl DocumentStore {
    /// Flip `acknowledged` from false (or missing) to true in one statement.
    ///
    /// The guard lives in the WHERE clause, so a concurrent writer can
    /// never observe the flag going back to false through this path.
    pub fn acknowledge_alert_doc(&self, path: &DocPath) -> HubResult<AckOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE document
             SET data = json_set(data, '$.acknowledged', json('true')), version = version + 1
             WHERE path = ?1 AND COALESCE(json_extract(data, '$.acknowledged'), 0) = 0",
            params![path.as_str()],
        )?;
        if changed == 0 {
            drop(tx);
            return if self.document_exists(path)? {
                Ok(AckOutcome::AlreadyAcknowledged)
            } else {
                Err(HubError::NotFound { path: path.to_string() })
            };
        }
        Self::append_change(&tx, path, ChangeKind::Update)?;
        tx.commit()?;
        Ok(AckOutcome::Acknowledged)
    }
}
