//! The signed-in identity and what it may read.
//!
//! RULE: every subscription and every one-shot read made on behalf of a
//! session goes through `Session::authorize` first. A path scoped to
//! another identity is only readable through an explicit link document
//! (institution membership or analyst client link), and only for the
//! profile and the latest risk snapshot.

use crate::{
    error::{HubError, HubResult},
    model::ClientLink,
    path::{CollectionPath, DocPath, Scope},
    store::{CollectionQuery, DocumentStore},
    types::{Identity, Tier},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity:       Identity,
    pub tier:           Tier,
    pub email:          String,
    pub display_name:   Option<String>,
    /// Set for institution sessions only.
    pub institution_id: Option<String>,
}

/// What a read targets.
#[derive(Debug, Clone, Copy)]
pub enum ReadTarget<'a> {
    Document(&'a DocPath),
    Collection(&'a CollectionPath),
}

impl ReadTarget<'_> {
    fn scope(&self) -> Scope {
        match self {
            Self::Document(p) => p.scope(),
            Self::Collection(p) => p.scope(),
        }
    }

    fn path(&self) -> &str {
        match self {
            Self::Document(p) => p.as_str(),
            Self::Collection(p) => p.as_str(),
        }
    }
}

impl Session {
    pub fn new(identity: impl Into<Identity>, tier: Tier, email: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            tier,
            email: email.into(),
            display_name: None,
            institution_id: None,
        }
    }

    pub fn with_institution(mut self, institution_id: impl Into<String>) -> Self {
        self.institution_id = Some(institution_id.into());
        self
    }

    /// Fail with `AccessDenied` unless this session may read `target`.
    pub fn authorize(&self, store: &DocumentStore, target: ReadTarget<'_>) -> HubResult<()> {
        if self.can_read(store, target)? {
            Ok(())
        } else {
            Err(HubError::AccessDenied {
                identity: self.identity.clone(),
                path: target.path().to_string(),
            })
        }
    }

    pub fn can_read(&self, store: &DocumentStore, target: ReadTarget<'_>) -> HubResult<bool> {
        match target.scope() {
            Scope::User(owner) if owner == self.identity => Ok(true),
            Scope::User(owner) => {
                if !Self::is_linkable(&owner, target)? {
                    return Ok(false);
                }
                self.is_linked_to(store, &owner)
            }
            Scope::Institution(inst) => Ok(self.tier == Tier::Institution
                && self.institution_id.as_deref() == Some(inst.as_str())),
            Scope::Analyst(analyst) => {
                Ok(self.tier == Tier::Analyst && analyst == self.identity)
            }
            Scope::Unscoped => Ok(false),
        }
    }

    /// Only the profile and the latest risk snapshot are shared across
    /// identities; transactions and alerts never are.
    fn is_linkable(owner: &str, target: ReadTarget<'_>) -> HubResult<bool> {
        match target {
            ReadTarget::Document(path) => {
                Ok(*path == DocPath::user(owner)? || *path == DocPath::risk_snapshot(owner)?)
            }
            ReadTarget::Collection(_) => Ok(false),
        }
    }

    /// True when a link document ties this session to `customer`.
    pub fn is_linked_to(&self, store: &DocumentStore, customer: &str) -> HubResult<bool> {
        match self.tier {
            Tier::Institution => match &self.institution_id {
                Some(inst) => store.document_exists(&DocPath::institution_member(inst, customer)?),
                None => Ok(false),
            },
            Tier::Analyst => {
                let links = store.list_collection(&CollectionQuery::all(
                    CollectionPath::client_links(&self.identity)?,
                ))?;
                Ok(links.into_iter().any(|doc| {
                    serde_json::from_value::<ClientLink>(doc.data)
                        .map(|link| link.client_id == customer)
                        .unwrap_or(false)
                }))
            }
            Tier::Consumer => Ok(false),
        }
    }
}
