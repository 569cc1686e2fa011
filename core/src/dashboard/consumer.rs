//! Consumer (B2C) views: risk gauge, transactions, alerts, spending.

use super::Bound;
use crate::{
    aggregate::{self, AlertSummary, CategorySlice, TrendPoint},
    derived::Derived,
    hub::LiveHub,
    model::{Alert, Record, RiskSnapshot, Transaction},
    path::{CollectionPath, DocPath},
    store::{AckOutcome, CollectionQuery},
    types::{RiskLevel, Tier},
};
use chrono::NaiveDate;
use serde::Serialize;

/// Consumer views only open for consumer sessions.
fn consumer_only(tier: Tier) -> bool {
    tier == Tier::Consumer
}

#[derive(Default)]
pub struct RiskScoreView {
    bound: Bound<Option<RiskSnapshot>>,
}

impl RiskScoreView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        self.bound.sync(hub, "risk score", |hub, session| {
            if !consumer_only(session.tier) {
                return Ok(None);
            }
            hub.subscribe_document(DocPath::risk_snapshot(&session.identity)?)
                .map(Some)
        })
    }

    pub fn score(&self) -> Option<RiskSnapshot> {
        self.bound.with_data(|s| s.clone())
    }

    pub fn level(&self) -> Option<RiskLevel> {
        self.score().map(|s| aggregate::risk_level(s.value))
    }

    pub fn loading(&self) -> bool {
        self.bound.loading()
    }
}

#[derive(Default)]
pub struct TransactionsView {
    bound: Bound<Vec<Record<Transaction>>>,
}

impl TransactionsView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        let limit = hub.config().transaction_limit;
        self.bound.sync(hub, "transactions", |hub, session| {
            if !consumer_only(session.tier) {
                return Ok(None);
            }
            open_transactions(hub, &session.identity, limit).map(Some)
        })
    }

    /// Newest first, at most `transaction_limit` entries.
    pub fn transactions(&self) -> Vec<Record<Transaction>> {
        self.bound.with_data(|t| t.clone())
    }

    pub fn loading(&self) -> bool {
        self.bound.loading()
    }
}

fn open_transactions(
    hub: &LiveHub,
    identity: &str,
    limit: usize,
) -> crate::error::HubResult<crate::live::LiveCollection<Transaction>> {
    hub.subscribe_collection(
        CollectionQuery::all(CollectionPath::transactions(identity)?)
            .newest_first("timestamp")
            .limit(limit),
    )
}

#[derive(Default)]
pub struct AlertsView {
    bound:   Bound<Vec<Record<Alert>>>,
    summary: Derived<u64, AlertSummary>,
}

impl AlertsView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        self.bound.sync(hub, "alerts", |hub, session| {
            if !consumer_only(session.tier) {
                return Ok(None);
            }
            hub.subscribe_collection(
                CollectionQuery::all(CollectionPath::alerts(&session.identity)?)
                    .newest_first("timestamp"),
            )
            .map(Some)
        })
    }

    pub fn alerts(&self) -> Vec<Record<Alert>> {
        self.bound.with_data(|a| a.clone())
    }

    pub fn summary(&mut self) -> &AlertSummary {
        let bound = &self.bound;
        self.summary
            .get(bound.revision(), || bound.with_data(|a| aggregate::alert_summary(a)))
    }

    pub fn loading(&self) -> bool {
        self.bound.loading()
    }

    /// Acknowledge one alert. Failures are logged and swallowed; the
    /// list itself only changes when the subscription delivers.
    pub fn acknowledge(&self, hub: &LiveHub, alert_id: &str) -> Option<AckOutcome> {
        hub.session()?;
        match hub.acknowledge_alert(alert_id) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("error acknowledging alert {alert_id}: {e}");
                None
            }
        }
    }
}

#[derive(Default)]
pub struct SpendingView {
    bound:       Bound<Vec<Record<Transaction>>>,
    by_category: Derived<u64, Vec<CategorySlice>>,
    trend:       Derived<(u64, NaiveDate), Vec<TrendPoint>>,
}

impl SpendingView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        let window = hub.config().spending_window;
        self.bound.sync(hub, "spending", |hub, session| {
            if !consumer_only(session.tier) {
                return Ok(None);
            }
            open_transactions(hub, &session.identity, window).map(Some)
        })
    }

    pub fn by_category(&mut self) -> &[CategorySlice] {
        let bound = &self.bound;
        self.by_category.get(bound.revision(), || {
            if bound.loading() {
                return Vec::new();
            }
            bound.with_data(|t| aggregate::spending_by_category(t))
        })
    }

    pub fn trend(&mut self, today: NaiveDate, days: u32) -> &[TrendPoint] {
        let bound = &self.bound;
        self.trend.get((bound.revision(), today), || {
            if bound.loading() {
                return Vec::new();
            }
            bound.with_data(|t| aggregate::spending_trend(t, today, days))
        })
    }

    pub fn loading(&self) -> bool {
        self.bound.loading()
    }

    /// How often each model has been rebuilt (for tests).
    pub fn build_counts(&self) -> (u64, u64) {
        (self.by_category.builds(), self.trend.builds())
    }
}

#[derive(Default)]
pub struct ConsumerDashboard {
    pub risk:         RiskScoreView,
    pub transactions: TransactionsView,
    pub alerts:       AlertsView,
    pub spending:     SpendingView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerState {
    pub loading:      bool,
    pub risk:         Option<RiskSnapshot>,
    pub risk_level:   Option<RiskLevel>,
    pub transactions: Vec<Record<Transaction>>,
    pub alerts:       Vec<Record<Alert>>,
    pub alert_summary: AlertSummary,
    pub spending_by_category: Vec<CategorySlice>,
    pub spending_trend: Vec<TrendPoint>,
}

impl ConsumerDashboard {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        // Evaluate every view; no short-circuit.
        let rebound = [
            self.risk.sync(hub),
            self.transactions.sync(hub),
            self.alerts.sync(hub),
            self.spending.sync(hub),
        ];
        rebound.contains(&true)
    }

    pub fn state(&mut self, hub: &LiveHub, today: NaiveDate) -> ConsumerState {
        let days = hub.config().trend_days;
        ConsumerState {
            loading: self.risk.loading()
                || self.transactions.loading()
                || self.alerts.loading()
                || self.spending.loading(),
            risk: self.risk.score(),
            risk_level: self.risk.level(),
            transactions: self.transactions.transactions(),
            alerts: self.alerts.alerts(),
            alert_summary: self.alerts.summary().clone(),
            spending_by_category: self.spending.by_category().to_vec(),
            spending_trend: self.spending.trend(today, days).to_vec(),
        }
    }
}
