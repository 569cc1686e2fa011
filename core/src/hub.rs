//! The live hub: single-threaded event loop over the document store.
//!
//! LOOP (one `dispatch()` call):
//!   1. Read the change log past the last delivered sequence.
//!   2. For each listener, in registration order: deliver one fresh
//!      snapshot if it is still waiting for its first one or if any of
//!      the new changes touches its target.
//!   3. Prune listeners that closed (dropped handles, halted on error).
//!
//! RULES:
//!   - Each listener re-reads only its own target, so a delivery can
//!     never carry documents from another identity's scope.
//!   - Per listener, snapshots follow server sequence order. Nothing is
//!     promised about order between listeners.
//!   - The session is the only shared state. Changing it closes every
//!     listener bound to a different identity.

use crate::{
    config::HubConfig,
    error::{HubError, HubResult},
    live::{Fetch, LiveCollection, LiveDocument, Registry, Target},
    model::Record,
    path::DocPath,
    session::{ReadTarget, Session},
    store::{AckOutcome, CollectionQuery, DocumentStore},
    types::ChangeSeq,
};
use serde::de::DeserializeOwned;
use std::{cell::RefCell, rc::Rc};

pub struct LiveHub {
    store:    DocumentStore,
    config:   HubConfig,
    session:  Option<Session>,
    registry: Rc<RefCell<Registry>>,
    cursor:   ChangeSeq,
}

impl LiveHub {
    /// Wrap a migrated store. Changes already in the log are treated as
    /// history: subscriptions start from a fresh read, not a replay.
    pub fn new(store: DocumentStore, config: HubConfig) -> HubResult<Self> {
        let cursor = store.latest_seq()?;
        Ok(Self {
            store,
            config,
            session: None,
            registry: Rc::new(RefCell::new(Registry::default())),
            cursor,
        })
    }

    /// In-memory store with the test config (used in tests).
    pub fn build_test() -> HubResult<Self> {
        let store = DocumentStore::in_memory()?;
        store.migrate()?;
        Self::new(store, HubConfig::default_test())
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.borrow().len()
    }

    fn require_session(&self) -> HubResult<&Session> {
        self.session.as_ref().ok_or(HubError::NotSignedIn)
    }

    // ── Session broadcast ───────────────────────────────────────────

    /// Replace the signed-in session. Every listener opened for another
    /// identity is closed and cleared before this returns.
    pub fn set_session(&mut self, session: Option<Session>) {
        let identity = session.as_ref().map(|s| s.identity.clone());
        let mut registry = self.registry.borrow_mut();
        let mut revoked = 0usize;
        for (_, listener) in registry.listeners_mut() {
            if Some(listener.identity()) != identity.as_deref() {
                listener.close(true);
                revoked += 1;
            }
        }
        registry.prune_closed();
        drop(registry);

        match &identity {
            Some(id) => log::info!("session bound to {id} ({revoked} subscriptions revoked)"),
            None => log::info!("session cleared ({revoked} subscriptions revoked)"),
        }
        self.session = session;
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Subscribe to one document. The first snapshot arrives on the next
    /// `dispatch()`; a missing document is delivered as `None`.
    pub fn subscribe_document<T>(&self, path: DocPath) -> HubResult<LiveDocument<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let session = self.require_session()?;
        if let Err(e) = session.authorize(&self.store, ReadTarget::Document(&path)) {
            log::warn!("subscription refused: {e}");
            return Err(e);
        }
        let fetch_path = path.clone();
        let fetch: Fetch<Option<T>> = Box::new(move |store: &DocumentStore| {
            store
                .get_document(&fetch_path)?
                .map(|doc| serde_json::from_value(doc.data))
                .transpose()
                .map_err(Into::into)
        });
        Ok(Registry::insert(
            &self.registry,
            session.identity.clone(),
            Target::Document(path),
            fetch,
        ))
    }

    /// Subscribe to the direct members of a collection.
    pub fn subscribe_collection<T>(&self, query: CollectionQuery) -> HubResult<LiveCollection<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let session = self.require_session()?;
        if let Err(e) = session.authorize(&self.store, ReadTarget::Collection(&query.collection)) {
            log::warn!("subscription refused: {e}");
            return Err(e);
        }
        let fetch_query = query.clone();
        let fetch: Fetch<Vec<Record<T>>> = Box::new(move |store: &DocumentStore| {
            store
                .list_collection(&fetch_query)?
                .into_iter()
                .map(|doc| -> HubResult<Record<T>> {
                    Ok(Record {
                        id: doc.id,
                        data: serde_json::from_value(doc.data)?,
                    })
                })
                .collect()
        });
        Ok(Registry::insert(
            &self.registry,
            session.identity.clone(),
            Target::Collection(query),
            fetch,
        ))
    }

    /// Deliver pending snapshots. Returns how many listeners received one.
    pub fn dispatch(&mut self) -> HubResult<usize> {
        let changes = self.store.changes_since(self.cursor)?;
        if let Some(last) = changes.last() {
            self.cursor = last.seq;
        }

        let mut registry = self.registry.borrow_mut();
        registry.prune_closed();
        let mut delivered = 0usize;
        for (_, listener) in registry.listeners_mut() {
            let due = listener.awaiting_first()
                || changes.iter().any(|c| listener.target().is_affected_by(c));
            if due {
                listener.deliver(&self.store);
                delivered += 1;
            }
        }
        let halted = registry.prune_closed();
        if halted > 0 {
            log::debug!("dispatch pruned {halted} closed subscriptions");
        }
        Ok(delivered)
    }

    // ── One-shot reads and mutations ────────────────────────────────

    /// Read a document once, with the same access rules as a subscription.
    pub fn read_document<T: DeserializeOwned>(&self, path: &DocPath) -> HubResult<Option<T>> {
        let session = self.require_session()?;
        session.authorize(&self.store, ReadTarget::Document(path))?;
        self.store
            .get_document(path)?
            .map(|doc| serde_json::from_value(doc.data))
            .transpose()
            .map_err(Into::into)
    }

    /// Mark one of the session's alerts as reviewed.
    ///
    /// Only ever sets the flag to true. Local state is not touched: the
    /// alerts subscription picks the change up on the next dispatch.
    pub fn acknowledge_alert(&self, alert_id: &str) -> HubResult<AckOutcome> {
        let session = self.require_session()?;
        let path = DocPath::alert(&session.identity, alert_id)?;
        let outcome = self.store.acknowledge_alert_doc(&path)?;
        log::debug!("acknowledge {path}: {outcome:?}");
        Ok(outcome)
    }
}
