//! Reactive keyed state container backing the dashboard context.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde_json::Value;
use shared::state::State;
use tracing::trace;

use crate::listeners::{run_isolated, ListenerSet, Subscription, SubscriptionId};

/// Subscriber callback, invoked with `(next, previous)`.
pub type StateCallback = dyn Fn(&State, &State) -> anyhow::Result<()> + Send + Sync;

/// The dashboard's shared UI context.
pub type ContextStore = KeyedStateContainer;

/// Key/value store that notifies subscribers whenever a merge actually
/// changes the state.
///
/// Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct KeyedStateContainer {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    state: State,
    subscribers: ListenerSet<StateCallback>,
    pending: VecDeque<Update>,
    dispatching: bool,
}

enum Update {
    Merge(State),
    Replace(State),
}

impl KeyedStateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(initial: State) -> Self {
        let store = Self::default();
        store.lock().state = initial;
        store
    }

    pub fn get_state(&self) -> State {
        self.lock().state.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().state.get(key).cloned()
    }

    /// Shallow-merges `partial` into the current state and notifies every
    /// subscriber if the result differs.
    ///
    /// Calls made while a notification round is running (for example from a
    /// subscriber) are queued and applied once that round finishes.
    pub fn set_state(&self, partial: State) {
        self.enqueue(Update::Merge(partial));
    }

    /// Replaces the whole state, notifying on change like `set_state`.
    pub fn replace_state(&self, state: State) {
        self.enqueue(Update::Replace(state));
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&State, &State) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: Arc<StateCallback> = Arc::new(callback);
        let id = self.lock().subscribers.insert(callback);
        let inner: Weak<Mutex<StoreInner>> = Arc::downgrade(&self.inner);
        Subscription::new(id, move |id| {
            if let Some(inner) = inner.upgrade() {
                lock_inner(&inner).subscribers.remove(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn enqueue(&self, update: Update) {
        {
            let mut inner = self.lock();
            inner.pending.push_back(update);
            if inner.dispatching {
                trace!(queued = inner.pending.len(), "queued nested state update");
                return;
            }
            inner.dispatching = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let (next, previous, subscribers) = {
                let mut inner = self.lock();
                let Some(update) = inner.pending.pop_front() else {
                    inner.dispatching = false;
                    return;
                };
                let next = match update {
                    Update::Merge(partial) => inner.state.merged(&partial),
                    Update::Replace(state) => state,
                };
                if next == inner.state {
                    continue;
                }
                let previous = std::mem::replace(&mut inner.state, next.clone());
                (next, previous, inner.subscribers.snapshot())
            };

            trace!(subscribers = subscribers.len(), "state changed");
            for (id, callback) in subscribers {
                if !self.is_subscribed(id) {
                    continue;
                }
                run_isolated("state subscriber", id, || callback(&next, &previous));
            }
        }
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lock().subscribers.contains(id)
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        lock_inner(&self.inner)
    }
}

// Callbacks never run under the lock, so a poisoned guard still holds a
// consistent state.
fn lock_inner(inner: &Mutex<StoreInner>) -> MutexGuard<'_, StoreInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
