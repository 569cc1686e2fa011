//! Shared primitive types used across the data layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a signed-in actor (the auth provider's uid).
pub type Identity = String;

/// A stable document identifier within its collection.
pub type DocId = String;

/// Server-assigned position of a write in the change log.
pub type ChangeSeq = i64;

/// Dashboard tier. Decides which dashboard and data scope an identity sees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Consumer,
    Institution,
    Analyst,
}

impl Tier {
    /// Parse the `tier` claim stored on a user profile.
    ///
    /// Profiles written by sign-up use `consumer|institution|analyst`,
    /// bulk-loaded ones use `B2C|B2B|B2Pro`. Anything else is `None`.
    pub fn from_claim(claim: &str) -> Option<Self> {
        match claim.trim().to_ascii_lowercase().as_str() {
            "consumer" | "b2c" => Some(Self::Consumer),
            "institution" | "b2b" => Some(Self::Institution),
            "analyst" | "b2pro" => Some(Self::Analyst),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumer => "consumer",
            Self::Institution => "institution",
            Self::Analyst => "analyst",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert severity shares the risk level scale.
pub type Severity = RiskLevel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Predictive,
    Fraud,
    Compliance,
}
