//! Store methods for the institution metrics roll-up.

use super::{CollectionQuery, DocumentStore};
use crate::{
    aggregate::{self, DEFAULT_CLIENT_SCORE},
    error::HubResult,
    model::InstitutionMetrics,
    path::{CollectionPath, DocPath},
};
use chrono::{DateTime, Utc};

impl DocumentStore {
    /// Recompute `institutions/{id}/metrics/realtime` from the members'
    /// latest risk snapshots and write it.
    ///
    /// Runs with backend privileges: no session, no read rules. A member
    /// without a snapshot adds nothing to the score total but still
    /// counts as a customer.
    pub fn refresh_institution_metrics(
        &self,
        institution_id: &str,
        now: DateTime<Utc>,
    ) -> HubResult<InstitutionMetrics> {
        let members = self.list_collection(&CollectionQuery::all(
            CollectionPath::institution_members(institution_id)?,
        ))?;

        let mut scores = Vec::with_capacity(members.len());
        for member in &members {
            if let Some(snapshot) = self.get_document(&DocPath::risk_snapshot(&member.id)?)? {
                let score = snapshot
                    .data
                    .get("value")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(DEFAULT_CLIENT_SCORE);
                scores.push(score);
            }
        }

        let metrics = aggregate::institution_metrics(members.len(), &scores, now);
        self.set_document(&DocPath::institution_metrics(institution_id)?, &metrics)?;
        log::debug!(
            "institution {institution_id}: {} members, average risk {:.1}",
            metrics.total_customers,
            metrics.average_risk
        );
        Ok(metrics)
    }
}
