//! Document shapes as stored in the document store.
//!
//! Field names on the wire are camelCase. Every collection document is
//! delivered together with its id (see [`Record`]); the id is not part
//! of the stored body.

use crate::types::{AlertType, DocId, Severity, TrendDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A collection member paired with its document id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record<T> {
    pub id:   DocId,
    #[serde(flatten)]
    pub data: T,
}

/// `users/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    /// Raw tier claim; parsed with `Tier::from_claim`.
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `users/{id}/risk_snapshots/latest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSnapshot {
    pub value: f64,
    #[serde(default)]
    pub trend: TrendDirection,
    #[serde(default, alias = "timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// `users/{id}/transactions/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "merchantName")]
    pub merchant: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "date")]
    pub timestamp: DateTime<Utc>,
    /// `debit` or `credit`; absent on older records.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub risk_flag: bool,
}

impl Transaction {
    /// Spending is any negative amount or an explicit debit.
    pub fn is_debit(&self) -> bool {
        self.amount < 0.0 || self.kind.as_deref() == Some("debit")
    }
}

/// `users/{id}/alerts/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub action_url: Option<String>,
}

/// `analysts/{id}/client_links/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLink {
    pub client_id: String,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

/// `institutions/{id}/users/{userId}`. The document id is the member id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionMember {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// `institutions/{id}/metrics/realtime`, written by the scheduled
/// aggregation job. That job writes snake_case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InstitutionMetrics {
    #[serde(default)]
    pub average_risk: f64,
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub high_risk_count: u64,
    #[serde(default)]
    pub critical_count: u64,
    #[serde(default)]
    pub compliance_rate: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
