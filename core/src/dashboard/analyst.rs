//! Analyst (B2Pro) view: the client kanban.
//!
//! Follows the analyst's `client_links` collection and keeps a profile
//! and a risk snapshot subscription per linked client.

use super::Bound;
use crate::{
    aggregate::{self, ClientCard, ClientInputs},
    derived::Derived,
    hub::LiveHub,
    live::LiveDocument,
    model::{ClientLink, Record, RiskSnapshot, UserProfile},
    path::{CollectionPath, DocPath},
    store::CollectionQuery,
    types::{Identity, Tier},
};
use serde::Serialize;
use std::collections::BTreeMap;

struct ClientFeeds {
    profile:  LiveDocument<UserProfile>,
    snapshot: LiveDocument<RiskSnapshot>,
}

type CardsKey = (u64, Vec<(Identity, u64, u64)>);

#[derive(Default)]
pub struct AnalystClientsView {
    links:   Bound<Vec<Record<ClientLink>>>,
    clients: BTreeMap<Identity, ClientFeeds>,
    cards:   Derived<CardsKey, Vec<ClientCard>>,
}

impl AnalystClientsView {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        let rebound = self.links.sync(hub, "client links", |hub, session| {
            if session.tier != Tier::Analyst {
                return Ok(None);
            }
            hub.subscribe_collection(CollectionQuery::all(CollectionPath::client_links(
                &session.identity,
            )?))
            .map(Some)
        });
        if rebound {
            self.clients.clear();
        }
        rebound | self.reconcile(hub)
    }

    fn reconcile(&mut self, hub: &LiveHub) -> bool {
        let wanted: Vec<Identity> = self
            .links
            .with_data(|links| links.iter().map(|l| l.data.client_id.clone()).collect());

        let before = self.clients.len();
        self.clients.retain(|id, _| wanted.contains(id));
        let mut changed = self.clients.len() != before;

        for id in wanted {
            if self.clients.contains_key(&id) {
                continue;
            }
            let opened = DocPath::user(&id)
                .and_then(|p| hub.subscribe_document(p))
                .and_then(|profile| {
                    let snapshot = hub.subscribe_document(DocPath::risk_snapshot(&id)?)?;
                    Ok(ClientFeeds { profile, snapshot })
                });
            match opened {
                Ok(feeds) => {
                    self.clients.insert(id, feeds);
                    changed = true;
                }
                Err(e) => log::error!("error fetching client {id}: {e}"),
            }
        }
        changed
    }

    fn key(&self) -> CardsKey {
        (
            self.links.revision(),
            self.clients
                .iter()
                .map(|(id, f)| (id.clone(), f.profile.revision(), f.snapshot.revision()))
                .collect(),
        )
    }

    pub fn cards(&mut self) -> &[ClientCard] {
        let key = self.key();
        let (links, clients) = (&self.links, &self.clients);
        self.cards.get(key, || build_cards(links, clients))
    }

    pub fn loading(&self) -> bool {
        self.links.loading()
            || self
                .clients
                .values()
                .any(|f| f.profile.is_loading() || f.snapshot.is_loading())
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

fn build_cards(
    links: &Bound<Vec<Record<ClientLink>>>,
    clients: &BTreeMap<Identity, ClientFeeds>,
) -> Vec<ClientCard> {
    links.with_data(|links| {
        // A link whose client feeds failed to open is skipped.
        let feeds: Vec<(&ClientLink, &ClientFeeds)> = links
            .iter()
            .filter_map(|l| clients.get(&l.data.client_id).map(|f| (&l.data, f)))
            .collect();
        let profiles: Vec<_> = feeds.iter().map(|(_, f)| f.profile.data()).collect();
        let snapshots: Vec<_> = feeds.iter().map(|(_, f)| f.snapshot.data()).collect();
        let inputs: Vec<ClientInputs<'_>> = feeds
            .iter()
            .zip(profiles.iter().zip(snapshots.iter()))
            .map(|(&(link, _), (profile, snapshot))| ClientInputs {
                link,
                profile: profile.as_ref(),
                snapshot: snapshot.as_ref(),
            })
            .collect();
        aggregate::client_cards(&inputs)
    })
}

#[derive(Default)]
pub struct AnalystDashboard {
    pub clients: AnalystClientsView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystState {
    pub loading: bool,
    pub clients: Vec<ClientCard>,
}

impl AnalystDashboard {
    pub fn sync(&mut self, hub: &LiveHub) -> bool {
        self.clients.sync(hub)
    }

    pub fn state(&mut self) -> AnalystState {
        AnalystState {
            loading: self.clients.loading(),
            clients: self.clients.cards().to_vec(),
        }
    }
}
