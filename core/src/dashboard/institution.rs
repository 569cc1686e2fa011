//! Institution (B2B) views: realtime KPIs and portfolio risk analytics.
//!
//! The analytics view follows the membership collection and keeps one
//! risk snapshot subscription per member. Members come and go with the
//! collection; their snapshot subscriptions are opened and dropped in
//! the same `sync`.

use super::Bound;
use crate::{
    aggregate::{self, DistributionBucket, HeatmapCell},
    derived::Derived,
    hub::LiveHub,
    live::LiveDocument,
    model::{InstitutionMember, InstitutionMetrics, Record, RiskSnapshot},
    path::{CollectionPath, DocPath},
    store::CollectionQuery,
    types::{Identity, Tier},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

fn institution_of(session: &crate::session::Session) -> Option<&str> {
    if session.tier != Tier::Institution {
        return None;
    }
    session.institution_id.as_deref()
}

#[derive(Default)]
pub struct InstitutionMetricsView {
    bound: Bound<Option<InstitutionMetrics>>,
}

impl InstitutionMetricsView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        self.bound.sync(hub, "institution metrics", |hub, session| {
            let Some(inst) = institution_of(session) else {
                return Ok(None);
            };
            hub.subscribe_document(DocPath::institution_metrics(inst)?)
                .map(Some)
        })
    }

    pub fn metrics(&self) -> Option<InstitutionMetrics> {
        self.bound.with_data(|m| m.clone())
    }

    pub fn loading(&self) -> bool {
        self.bound.loading()
    }
}

/// Fingerprint of everything the analytics models read.
type AnalyticsKey = (u64, Vec<(Identity, u64)>);

#[derive(Default)]
pub struct InstitutionAnalyticsView {
    members:      Bound<Vec<Record<InstitutionMember>>>,
    snapshots:    BTreeMap<Identity, LiveDocument<RiskSnapshot>>,
    heatmap:      Derived<AnalyticsKey, Vec<HeatmapCell>>,
    distribution: Derived<AnalyticsKey, Vec<DistributionBucket>>,
}

impl InstitutionAnalyticsView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        let rebound = self.members.sync(hub, "institution members", |hub, session| {
            let Some(inst) = institution_of(session) else {
                return Ok(None);
            };
            hub.subscribe_collection(CollectionQuery::all(CollectionPath::institution_members(inst)?))
                .map(Some)
        });
        if rebound {
            self.snapshots.clear();
        }
        rebound | self.reconcile(hub)
    }

    /// Open snapshot subscriptions for new members, drop departed ones.
    fn reconcile(&mut self, hub: &LiveHub) -> bool {
        let wanted: BTreeSet<Identity> = self
            .members
            .with_data(|m| m.iter().map(|r| r.id.clone()).collect());

        let before = self.snapshots.len();
        self.snapshots.retain(|id, _| wanted.contains(id));
        let mut changed = self.snapshots.len() != before;

        for id in wanted {
            if self.snapshots.contains_key(&id) {
                continue;
            }
            match DocPath::risk_snapshot(&id).and_then(|p| hub.subscribe_document(p)) {
                Ok(live) => {
                    self.snapshots.insert(id, live);
                    changed = true;
                }
                Err(e) => log::error!("error fetching institution user {id}: {e}"),
            }
        }
        changed
    }

    fn key(&self) -> AnalyticsKey {
        (
            self.members.revision(),
            self.snapshots
                .iter()
                .map(|(id, live)| (id.clone(), live.revision()))
                .collect(),
        )
    }

    /// Scores of members that have a snapshot, in member id order.
    pub fn scores(&self) -> Vec<f64> {
        self.snapshots
            .values()
            .filter_map(|live| live.data().as_ref().map(|s| s.value))
            .collect()
    }

    pub fn heatmap(&mut self) -> &[HeatmapCell] {
        let key = self.key();
        let scores = self.scores();
        self.heatmap.get(key, || aggregate::risk_heatmap(&scores))
    }

    pub fn distribution(&mut self) -> &[DistributionBucket] {
        let key = self.key();
        let scores = self.scores();
        self.distribution.get(key, || aggregate::risk_distribution(&scores))
    }

    pub fn loading(&self) -> bool {
        self.members.loading() || self.snapshots.values().any(|l| l.is_loading())
    }

    pub fn member_count(&self) -> usize {
        self.snapshots.len()
    }
}

#[derive(Default)]
pub struct InstitutionDashboard {
    pub metrics:   InstitutionMetricsView,
    pub analytics: InstitutionAnalyticsView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionState {
    pub loading:      bool,
    pub metrics:      Option<InstitutionMetrics>,
    pub members:      usize,
    pub heatmap:      Vec<HeatmapCell>,
    pub distribution: Vec<DistributionBucket>,
}

impl InstitutionDashboard {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        let rebound = [self.metrics.sync(hub), self.analytics.sync(hub)];
        rebound.contains(&true)
    }

    pub fn state(&mut self) -> InstitutionState {
        InstitutionState {
            loading: self.metrics.loading() || self.analytics.loading(),
            metrics: self.metrics.metrics(),
            members: self.analytics.member_count(),
            heatmap: self.analytics.heatmap().to_vec(),
            distribution: self.analytics.distribution().to_vec(),
        }
    }
}
