//! The change feed: every write to the store appends one entry.
//!
//! RULE: the change log is the only source of "something changed".
//! Subscriptions never poll documents; they react to change entries.

use crate::types::ChangeSeq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Set,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set    => "set",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "set"    => Some(Self::Set),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A change log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub seq:        ChangeSeq,
    pub path:       String,
    pub collection: String,
    pub kind:       ChangeKind,
}
