//! Dashboard view units.
//!
//! Each view owns its subscriptions and the view models derived from
//! them. Views never talk to each other; the only thing they share is
//! the hub's session, read on every `sync`.
//!
//! CYCLE (driven by the shell):
//!   1. `hub.dispatch()` delivers snapshots into handles.
//!   2. `view.sync(&hub)` rebinds on identity change and opens any
//!      follow-up subscriptions the new data calls for.
//!   3. Repeat until nothing moves (`Dashboard::pump`).

pub mod analyst;
pub mod consumer;
pub mod institution;

use crate::{
    error::HubResult,
    hub::LiveHub,
    live::Live,
    session::Session,
    types::{Identity, Tier},
};
use chrono::NaiveDate;
use serde::Serialize;

/// Upper bound on sync/dispatch rounds in one `pump`.
const MAX_PUMP_ROUNDS: usize = 8;

/// A subscription bound to the identity it was opened for.
pub struct Bound<S> {
    identity: Option<Identity>,
    live:     Option<Live<S>>,
}

impl<S> Default for Bound<S> {
    fn default() -> Self {
        Self { identity: None, live: None }
    }
}

impl<S> Bound<S> {
    /// Reopen when the session identity differs from the bound one.
    /// `open` returns `Ok(None)` when the session has nothing to show
    /// here (wrong tier). Errors are logged and leave the view empty.
    ///
    /// Returns true when the binding changed.
    pub fn sync<F>(&mut self, hub: &LiveHub, what: &str, open: F) -> bool
    where
        F: FnOnce(&LiveHub, &Session) -> HubResult<Option<Live<S>>>,
    {
        let current = hub.session().map(|s| s.identity.clone());
        if current == self.identity {
            return false;
        }
        // Drop the old handle first so its listener is gone before the
        // new one registers.
        self.live = None;
        self.identity = current;
        if let Some(session) = hub.session() {
            match open(hub, session) {
                Ok(live) => self.live = live,
                Err(e) => log::error!("{what}: cannot subscribe: {e}"),
            }
        }
        true
    }

    pub fn live(&self) -> Option<&Live<S>> {
        self.live.as_ref()
    }

    /// Signed out or unbound views are never loading.
    pub fn loading(&self) -> bool {
        self.live.as_ref().map(|l| l.is_loading()).unwrap_or(false)
    }

    pub fn revision(&self) -> u64 {
        self.live.as_ref().map(|l| l.revision()).unwrap_or(0)
    }

    pub fn error(&self) -> Option<String> {
        self.live.as_ref().and_then(|l| l.error())
    }
}

impl<S: Default> Bound<S> {
    /// Run `f` over the mirrored data, or over an empty value when unbound.
    pub fn with_data<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        match &self.live {
            Some(live) => {
                let data = live.data();
                f(&data)
            }
            None => f(&S::default()),
        }
    }
}

/// The dashboard for one tier.
pub enum Dashboard {
    Consumer(consumer::ConsumerDashboard),
    Institution(institution::InstitutionDashboard),
    Analyst(analyst::AnalystDashboard),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum DashboardState {
    Consumer(consumer::ConsumerState),
    Institution(institution::InstitutionState),
    Analyst(analyst::AnalystState),
}

impl Dashboard {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Consumer => Self::Consumer(Default::default()),
            Tier::Institution => Self::Institution(Default::default()),
            Tier::Analyst => Self::Analyst(Default::default()),
        }
    }

    /// Rebind every view. Returns true when any view opened or dropped
    /// a subscription.
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        match self {
            Self::Consumer(d) => d.sync(hub),
            Self::Institution(d) => d.sync(hub),
            Self::Analyst(d) => d.sync(hub),
        }
    }

    /// Alternate `sync` and `dispatch` until the views settle.
    /// Returns the total number of snapshots delivered.
    pub fn pump(&mut self, hub: &mut LiveHub) -> HubResult<usize> {
        let mut delivered = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            let rebound = self.sync(hub);
            let n = hub.dispatch()?;
            delivered += n;
            if n == 0 && !rebound {
                break;
            }
        }
        Ok(delivered)
    }

    pub fn state(&mut self, hub: &LiveHub, today: NaiveDate) -> DashboardState {
        match self {
            Self::Consumer(d) => DashboardState::Consumer(d.state(hub, today)),
            Self::Institution(d) => DashboardState::Institution(d.state()),
            Self::Analyst(d) => DashboardState::Analyst(d.state()),
        }
    }
}
