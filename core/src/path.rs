//! Document and collection paths.
//!
//! A path alternates collection and document segments:
//! `users` is a collection, `users/u1` a document,
//! `users/u1/alerts` a collection again. Every path has a root scope
//! (the first two segments) that decides who may read it.

use crate::error::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const USERS: &str = "users";
pub const INSTITUTIONS: &str = "institutions";
pub const ANALYSTS: &str = "analysts";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(String);

/// The owner root of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    User(String),
    Institution(String),
    Analyst(String),
    /// Any root the data layer does not know about.
    Unscoped,
}

fn split_checked(raw: &str) -> HubResult<Vec<&str>> {
    let segments: Vec<&str> = raw.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(HubError::InvalidPath {
            path: raw.to_string(),
            reason: "empty segment",
        });
    }
    Ok(segments)
}

/// Ids spliced into typed paths must be a single segment.
fn check_ids(ids: &[&str]) -> HubResult<()> {
    for id in ids {
        if id.is_empty() || id.contains('/') {
            return Err(HubError::InvalidPath {
                path: (*id).to_string(),
                reason: "ids must be a single non-empty segment",
            });
        }
    }
    Ok(())
}

fn scope_of(segments: &[&str]) -> Scope {
    match segments {
        [USERS, id, ..] => Scope::User((*id).to_string()),
        [INSTITUTIONS, id, ..] => Scope::Institution((*id).to_string()),
        [ANALYSTS, id, ..] => Scope::Analyst((*id).to_string()),
        _ => Scope::Unscoped,
    }
}

impl DocPath {
    pub fn parse(raw: &str) -> HubResult<Self> {
        let segments = split_checked(raw)?;
        if segments.len() % 2 != 0 {
            return Err(HubError::InvalidPath {
                path: raw.to_string(),
                reason: "document paths have an even number of segments",
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        let (parent, _) = self.0.rsplit_once('/').unwrap_or(("", &self.0));
        CollectionPath(parent.to_string())
    }

    pub fn id(&self) -> &str {
        self.0.rsplit_once('/').map(|(_, id)| id).unwrap_or(&self.0)
    }

    pub fn collection(&self, name: &str) -> HubResult<CollectionPath> {
        check_ids(&[name])?;
        CollectionPath::parse(&format!("{}/{name}", self.0))
    }

    pub fn scope(&self) -> Scope {
        scope_of(&self.0.split('/').collect::<Vec<_>>())
    }

    // ── Paths read by the dashboards ─────────────────────────────────

    pub fn user(user_id: &str) -> HubResult<Self> {
        check_ids(&[user_id])?;
        Self::parse(&format!("{USERS}/{user_id}"))
    }

    pub fn transaction(user_id: &str, txn_id: &str) -> HubResult<Self> {
        check_ids(&[user_id, txn_id])?;
        Self::parse(&format!("{USERS}/{user_id}/transactions/{txn_id}"))
    }

    pub fn risk_snapshot(user_id: &str) -> HubResult<Self> {
        check_ids(&[user_id])?;
        Self::parse(&format!("{USERS}/{user_id}/risk_snapshots/latest"))
    }

    pub fn alert(user_id: &str, alert_id: &str) -> HubResult<Self> {
        check_ids(&[user_id, alert_id])?;
        Self::parse(&format!("{USERS}/{user_id}/alerts/{alert_id}"))
    }

    pub fn institution_metrics(institution_id: &str) -> HubResult<Self> {
        check_ids(&[institution_id])?;
        Self::parse(&format!("{INSTITUTIONS}/{institution_id}/metrics/realtime"))
    }

    pub fn institution_member(institution_id: &str, user_id: &str) -> HubResult<Self> {
        check_ids(&[institution_id, user_id])?;
        Self::parse(&format!("{INSTITUTIONS}/{institution_id}/users/{user_id}"))
    }

    pub fn client_link(analyst_id: &str, link_id: &str) -> HubResult<Self> {
        check_ids(&[analyst_id, link_id])?;
        Self::parse(&format!("{ANALYSTS}/{analyst_id}/client_links/{link_id}"))
    }
}

impl CollectionPath {
    pub fn parse(raw: &str) -> HubResult<Self> {
        let segments = split_checked(raw)?;
        if segments.len() % 2 != 1 {
            return Err(HubError::InvalidPath {
                path: raw.to_string(),
                reason: "collection paths have an odd number of segments",
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: &str) -> HubResult<DocPath> {
        check_ids(&[id])?;
        DocPath::parse(&format!("{}/{id}", self.0))
    }

    pub fn scope(&self) -> Scope {
        scope_of(&self.0.split('/').collect::<Vec<_>>())
    }

    pub fn transactions(user_id: &str) -> HubResult<Self> {
        check_ids(&[user_id])?;
        Self::parse(&format!("{USERS}/{user_id}/transactions"))
    }

    pub fn alerts(user_id: &str) -> HubResult<Self> {
        check_ids(&[user_id])?;
        Self::parse(&format!("{USERS}/{user_id}/alerts"))
    }

    pub fn institution_members(institution_id: &str) -> HubResult<Self> {
        check_ids(&[institution_id])?;
        Self::parse(&format!("{INSTITUTIONS}/{institution_id}/users"))
    }

    pub fn client_links(analyst_id: &str) -> HubResult<Self> {
        check_ids(&[analyst_id])?;
        Self::parse(&format!("{ANALYSTS}/{analyst_id}/client_links"))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocPath {
    type Error = HubError;
    fn try_from(raw: String) -> HubResult<Self> {
        Self::parse(&raw)
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = HubError;
    fn try_from(raw: String) -> HubResult<Self> {
        Self::parse(&raw)
    }
}

impl From<DocPath> for String {
    fn from(p: DocPath) -> String {
        p.0
    }
}

impl From<CollectionPath> for String {
    fn from(p: CollectionPath) -> String {
        p.0
    }
}
