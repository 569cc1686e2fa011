//! Subscription handles and the registry they live in.
//!
//! A handle (`Live<S>`) owns the local state of one subscription. The hub
//! keeps a type-erased `Listener` for it in the `Registry`; the two share
//! the state cell and nothing else. Dropping the handle removes the
//! listener, so a discarded view unit never receives another delivery.

use crate::{
    error::HubResult,
    event::ChangeEvent,
    model::Record,
    path::DocPath,
    store::{CollectionQuery, DocumentStore},
    types::Identity,
};
use serde::Serialize;
use std::{
    cell::{Ref, RefCell},
    collections::BTreeMap,
    rc::{Rc, Weak},
};

pub type SubscriptionId = u64;

/// Local mirror of one subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState<S> {
    pub data:     S,
    /// True until the first snapshot (or error) arrives.
    pub loading:  bool,
    pub error:    Option<String>,
    /// Bumped on every delivered snapshot; derived models key on it.
    pub revision: u64,
    /// No further deliveries will arrive.
    pub closed:   bool,
}

impl<S: Default> LiveState<S> {
    fn pending() -> Self {
        Self {
            data:     S::default(),
            loading:  true,
            error:    None,
            revision: 0,
            closed:   false,
        }
    }
}

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Document(DocPath),
    Collection(CollectionQuery),
}

impl Target {
    /// A document target reacts to writes of exactly that document; a
    /// collection target to writes of its direct members.
    pub fn is_affected_by(&self, change: &ChangeEvent) -> bool {
        match self {
            Self::Document(path) => change.path == path.as_str(),
            Self::Collection(query) => change.collection == query.collection.as_str(),
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            Self::Document(path) => path.as_str(),
            Self::Collection(query) => query.collection.as_str(),
        }
    }
}

pub(crate) type Shared<S> = Rc<RefCell<LiveState<S>>>;
pub(crate) type Fetch<S> = Box<dyn Fn(&DocumentStore) -> HubResult<S>>;

/// The hub-side half of a subscription.
pub(crate) trait Listener {
    fn identity(&self) -> &str;
    fn target(&self) -> &Target;
    /// True when this listener has not yet received its first snapshot.
    fn awaiting_first(&self) -> bool;
    /// Re-read the target and replace local state wholesale.
    fn deliver(&mut self, store: &DocumentStore);
    /// Stop deliveries. `clear` drops the mirrored data as well.
    fn close(&mut self, clear: bool);
    fn is_closed(&self) -> bool;
}

pub(crate) struct Subscription<S> {
    id:       SubscriptionId,
    identity: Identity,
    target:   Target,
    state:    Shared<S>,
    fetch:    Fetch<S>,
}

impl<S: Default> Listener for Subscription<S> {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn awaiting_first(&self) -> bool {
        self.state.borrow().loading
    }

    fn deliver(&mut self, store: &DocumentStore) {
        if self.is_closed() {
            return;
        }
        match (self.fetch)(store) {
            Ok(data) => {
                let mut state = self.state.borrow_mut();
                state.data = data;
                state.loading = false;
                state.revision += 1;
                log::debug!(
                    "subscription {} ({}) revision {}",
                    self.id,
                    self.target.describe(),
                    state.revision
                );
            }
            Err(e) => {
                // No retry: the first error freezes this subscription.
                log::error!(
                    "subscription {} ({}) failed, halting: {e}",
                    self.id,
                    self.target.describe()
                );
                let mut state = self.state.borrow_mut();
                state.error = Some(e.to_string());
                state.loading = false;
                state.closed = true;
            }
        }
    }

    fn close(&mut self, clear: bool) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.loading = false;
        if clear {
            state.data = S::default();
        }
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

/// All live listeners, iterated in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    next_id:   SubscriptionId,
    listeners: BTreeMap<SubscriptionId, Box<dyn Listener>>,
}

impl Registry {
    pub(crate) fn insert<S: Default + 'static>(
        registry: &Rc<RefCell<Registry>>,
        identity: Identity,
        target: Target,
        fetch: Fetch<S>,
    ) -> Live<S> {
        let state: Shared<S> = Rc::new(RefCell::new(LiveState::pending()));
        let mut reg = registry.borrow_mut();
        reg.next_id += 1;
        let id = reg.next_id;
        reg.listeners.insert(
            id,
            Box::new(Subscription {
                id,
                identity: identity.clone(),
                target: target.clone(),
                state: Rc::clone(&state),
                fetch,
            }),
        );
        Live {
            id,
            identity,
            target,
            state,
            registry: Rc::downgrade(registry),
        }
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub(crate) fn listeners_mut(
        &mut self,
    ) -> impl Iterator<Item = (&SubscriptionId, &mut Box<dyn Listener>)> {
        self.listeners.iter_mut()
    }

    /// Drop every listener that will never deliver again.
    pub(crate) fn prune_closed(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|_, l| !l.is_closed());
        before - self.listeners.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Handle to one subscription. Owned by exactly one view unit.
pub struct Live<S> {
    id:       SubscriptionId,
    identity: Identity,
    target:   Target,
    state:    Shared<S>,
    registry: Weak<RefCell<Registry>>,
}

pub type LiveDocument<T> = Live<Option<T>>;
pub type LiveCollection<T> = Live<Vec<Record<T>>>;

impl<S> Live<S> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The identity this subscription was opened for.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> Ref<'_, LiveState<S>> {
        self.state.borrow()
    }

    pub fn data(&self) -> Ref<'_, S> {
        Ref::map(self.state.borrow(), |s| &s.data)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl<S> Drop for Live<S> {
    fn drop(&mut self) {
        self.state.borrow_mut().closed = true;
        if let Some(registry) = self.registry.upgrade() {
            // A dispatch in progress holds the registry; it prunes closed
            // listeners itself once it is done.
            if let Ok(mut reg) = registry.try_borrow_mut() {
                reg.remove(self.id);
            }
        }
    }
}
