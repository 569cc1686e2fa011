//! Derived view model builders.
//!
//! All builders are pure and order-independent: the same multiset of
//! input records gives the same output regardless of input order. Empty
//! input gives empty output (the heatmap is the one fixed-size model:
//! it always has `HEATMAP_CELLS` cells).

use crate::{
    model::{Alert, ClientLink, InstitutionMetrics, Record, RiskSnapshot, Transaction, UserProfile},
    types::{RiskLevel, Severity, TrendDirection},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const HEATMAP_CELLS: usize = 100;
/// Score shown for a linked client without a risk snapshot.
pub const DEFAULT_CLIENT_SCORE: f64 = 50.0;
/// Institution KPI thresholds, both exclusive.
pub const HIGH_RISK_SCORE: f64 = 70.0;
pub const CRITICAL_RISK_SCORE: f64 = 85.0;

const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("grocery",       "#10b981"),
    ("dining",        "#f59e0b"),
    ("transport",     "#3b82f6"),
    ("utilities",     "#6366f1"),
    ("entertainment", "#a855f7"),
    ("shopping",      "#ec4899"),
    ("healthcare",    "#ef4444"),
    ("other",         "#94a3b8"),
];

const DISTRIBUTION_BUCKETS: &[(&str, f64, &str)] = &[
    ("0-20",   20.0,  "#10b981"),
    ("21-40",  40.0,  "#34d399"),
    ("41-60",  60.0,  "#fbbf24"),
    ("61-80",  80.0,  "#f59e0b"),
    ("81-100", f64::INFINITY, "#ef4444"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub category:   String,
    pub name:       String,
    pub amount:     f64,
    pub percentage: u32,
    pub color:      &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date:  String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub id:      String,
    pub segment: String,
    /// Mean score of the identities in this cell, 0 when empty.
    pub risk:    f64,
    pub count:   u32,
    pub trend:   TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBucket {
    pub name:  &'static str,
    pub value: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AlertSummary {
    pub total:          usize,
    pub unacknowledged: usize,
    pub by_severity:    BTreeMap<Severity, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientCard {
    pub id:           String,
    pub name:         String,
    pub risk_score:   f64,
    pub risk_level:   RiskLevel,
    pub trend:        TrendDirection,
    pub last_contact: Option<DateTime<Utc>>,
}

/// Band a 0–100 score.
pub fn risk_level(score: f64) -> RiskLevel {
    if score > 80.0 {
        RiskLevel::Critical
    } else if score > 60.0 {
        RiskLevel::High
    } else if score > 35.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn category_color(category: &str) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .or_else(|| CATEGORY_COLORS.iter().find(|(name, _)| *name == "other"))
        .map(|(_, color)| *color)
        .unwrap_or("#94a3b8")
}

/// Float sum that does not depend on the order values arrived in.
fn sorted_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Debit spending per category, sorted by category key. Keys are taken
/// verbatim; only the color lookup ignores case.
pub fn spending_by_category(transactions: &[Record<Transaction>]) -> Vec<CategorySlice> {
    let mut amounts: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for txn in transactions.iter().map(|r| &r.data).filter(|t| t.is_debit()) {
        let category = txn
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("other");
        amounts
            .entry(category.to_string())
            .or_default()
            .push(txn.amount.abs());
    }

    let totals: Vec<(String, f64)> = amounts
        .into_iter()
        .map(|(category, values)| (category, sorted_sum(values)))
        .collect();
    let total = sorted_sum(totals.iter().map(|(_, amount)| *amount).collect());
    if total <= 0.0 {
        return Vec::new();
    }

    totals
        .into_iter()
        .map(|(category, amount)| CategorySlice {
            name: capitalize(&category),
            percentage: (amount / total * 100.0).round() as u32,
            color: category_color(&category),
            amount,
            category,
        })
        .collect()
}

/// Daily debit totals for the `days` days ending at `today`, oldest first.
pub fn spending_trend(
    transactions: &[Record<Transaction>],
    today: NaiveDate,
    days: u32,
) -> Vec<TrendPoint> {
    if transactions.is_empty() || days == 0 {
        return Vec::new();
    }
    let first = today - Duration::days(i64::from(days) - 1);
    let mut daily: BTreeMap<NaiveDate, Vec<f64>> = (0..days)
        .map(|i| (first + Duration::days(i64::from(i)), Vec::new()))
        .collect();

    for txn in transactions.iter().map(|r| &r.data).filter(|t| t.is_debit()) {
        if let Some(amounts) = daily.get_mut(&txn.timestamp.date_naive()) {
            amounts.push(txn.amount.abs());
        }
    }

    daily
        .into_iter()
        .map(|(date, amounts)| TrendPoint {
            date: date.format("%b %-d").to_string(),
            value: sorted_sum(amounts),
        })
        .collect()
}

/// Bucket scores into 100 one-point cells. Scores are clamped to
/// [0, 100]; 100 lands in the last cell.
pub fn risk_heatmap(scores: &[f64]) -> Vec<HeatmapCell> {
    let mut members: Vec<Vec<f64>> = vec![Vec::new(); HEATMAP_CELLS];
    for score in scores.iter().copied().filter(|s| !s.is_nan()) {
        let clamped = score.clamp(0.0, 100.0);
        let idx = (clamped.floor() as usize).min(HEATMAP_CELLS - 1);
        members[idx].push(clamped);
    }

    members
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let count = cell.len() as u32;
            let risk = if cell.is_empty() {
                0.0
            } else {
                let len = cell.len() as f64;
                sorted_sum(cell) / len
            };
            HeatmapCell {
                id: i.to_string(),
                segment: format!("Segment {}", i + 1),
                risk,
                count,
                trend: TrendDirection::Stable,
            }
        })
        .collect()
}

/// Five-band score distribution, upper bounds inclusive.
pub fn risk_distribution(scores: &[f64]) -> Vec<DistributionBucket> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mut counts = [0u32; 5];
    for score in scores.iter().copied().filter(|s| !s.is_nan()) {
        let idx = DISTRIBUTION_BUCKETS
            .iter()
            .position(|(_, upper, _)| score <= *upper)
            .unwrap_or(DISTRIBUTION_BUCKETS.len() - 1);
        counts[idx] += 1;
    }
    DISTRIBUTION_BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(name, _, color), value)| DistributionBucket { name, value, color })
        .collect()
}

/// Institution KPIs over `member_count` members, given the scores of
/// the members that have a risk snapshot. Members without one count
/// towards the average as zero. No members gives an average of 50 and
/// full compliance.
pub fn institution_metrics(
    member_count: usize,
    scores: &[f64],
    now: DateTime<Utc>,
) -> InstitutionMetrics {
    let high = scores.iter().filter(|&&s| s > HIGH_RISK_SCORE).count() as u64;
    let critical = scores.iter().filter(|&&s| s > CRITICAL_RISK_SCORE).count() as u64;
    let (average_risk, compliance_rate) = if member_count == 0 {
        (50.0, 100.0)
    } else {
        let members = member_count as f64;
        (
            sorted_sum(scores.to_vec()) / members,
            100.0 - high as f64 / members * 100.0,
        )
    };
    InstitutionMetrics {
        average_risk,
        total_customers: member_count as u64,
        high_risk_count: high,
        critical_count: critical,
        compliance_rate,
        updated_at: Some(now),
    }
}

pub fn alert_summary(alerts: &[Record<Alert>]) -> AlertSummary {
    let mut summary = AlertSummary::default();
    for alert in alerts.iter().map(|r| &r.data) {
        summary.total += 1;
        if !alert.acknowledged {
            summary.unacknowledged += 1;
        }
        *summary.by_severity.entry(alert.severity).or_insert(0) += 1;
    }
    summary
}

/// Everything known about one linked client.
#[derive(Debug, Clone, Copy)]
pub struct ClientInputs<'a> {
    pub link:     &'a ClientLink,
    pub profile:  Option<&'a UserProfile>,
    pub snapshot: Option<&'a RiskSnapshot>,
}

/// Analyst kanban cards, sorted by client id.
pub fn client_cards(clients: &[ClientInputs<'_>]) -> Vec<ClientCard> {
    let mut cards: Vec<ClientCard> = clients
        .iter()
        .map(|c| {
            let score = c.snapshot.map(|s| s.value).unwrap_or(DEFAULT_CLIENT_SCORE);
            ClientCard {
                id: c.link.client_id.clone(),
                name: display_name(c.profile),
                risk_score: score,
                risk_level: risk_level(score),
                trend: c.snapshot.map(|s| s.trend).unwrap_or_default(),
                last_contact: c.link.assigned_at,
            }
        })
        .collect();
    cards.sort_by(|a, b| a.id.cmp(&b.id));
    cards
}

fn display_name(profile: Option<&UserProfile>) -> String {
    profile
        .and_then(|p| {
            p.display_name
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| {
                    p.email
                        .as_deref()
                        .and_then(|e| e.split('@').next())
                        .filter(|local| !local.is_empty())
                        .map(str::to_string)
                })
        })
        .unwrap_or_else(|| "Unknown Client".to_string())
}
