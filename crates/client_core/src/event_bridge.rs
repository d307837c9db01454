//! Named broadcast events between dashboard components that must not
//! reference each other directly.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::listeners::{run_isolated, ListenerSet, Subscription};

pub mod events {
    /// Payload: `{"issue": "AB-1"}` or `{"issue": null}`.
    pub const TICKET_SELECTED: &str = "ticket-selected";
    /// Payload: any subset of `currentQueue`, `currentDesk`, `issuesCount`.
    pub const VIEW_CHANGED: &str = "view-changed";
    pub const SLA_UPDATED: &str = "sla-updated";
    pub const ML_PRELOAD_PROGRESS: &str = "ml-preload-progress";
    pub const SUGGESTIONS_REFRESHED: &str = "suggestions-refreshed";
}

pub type EventHandler = dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync;

#[derive(Clone, Default)]
pub struct EventBridge {
    handlers: Arc<Mutex<HashMap<String, ListenerSet<EventHandler>>>>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload` to the handlers registered for `event`, in
    /// registration order. Returns how many handlers completed without error.
    pub fn emit(&self, event: &str, payload: Value) -> usize {
        let handlers = match self.lock().get(event) {
            Some(set) => set.snapshot(),
            None => {
                trace!(event, "no listeners");
                return 0;
            }
        };

        let mut delivered = 0;
        for (id, handler) in handlers {
            let still_registered = self
                .lock()
                .get(event)
                .is_some_and(|set| set.contains(id));
            if !still_registered {
                continue;
            }
            if run_isolated("event handler", id, || handler(&payload)) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Serializes `payload` and emits it. Serialization failures are logged
    /// and nothing is delivered.
    pub fn emit_json<T: Serialize>(&self, event: &str, payload: &T) -> usize {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit(event, value),
            Err(err) => {
                warn!(event, error = %err, "failed to serialize event payload");
                0
            }
        }
    }

    pub fn on<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Arc<EventHandler> = Arc::new(handler);
        let id = self
            .lock()
            .entry(event.to_string())
            .or_default()
            .insert(handler);

        let handlers = Arc::downgrade(&self.handlers);
        let event = event.to_string();
        Subscription::new(id, move |id| {
            let Some(handlers) = handlers.upgrade() else {
                return;
            };
            let mut handlers = handlers.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(set) = handlers.get_mut(&event) {
                set.remove(id);
                if set.is_empty() {
                    handlers.remove(&event);
                }
            }
        })
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, ListenerSet::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ListenerSet<EventHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/event_bridge_tests.rs"]
mod tests;
