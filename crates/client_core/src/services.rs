//! Service bundle built once at start-up and handed to every consumer.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use shared::{
    context::{keys, select_issue},
    domain::IssueKey,
    state::State,
};
use tracing::debug;

use crate::{
    api::{FlowingApi, MissingPreloadBackend, MissingSlaSource, PreloadBackend, SlaSource},
    capabilities::CapabilityRegistry,
    event_bridge::{events, EventBridge},
    listeners::Subscription,
    store::ContextStore,
};

const VIEW_KEYS: [&str; 3] = [keys::CURRENT_QUEUE, keys::CURRENT_DESK, keys::ISSUES_COUNT];

pub struct Services {
    pub store: ContextStore,
    pub bridge: EventBridge,
    pub capabilities: CapabilityRegistry,
    links: Vec<Subscription>,
}

impl Services {
    /// Wires an empty context to the bridge. Capabilities are registered by
    /// the caller.
    pub fn new() -> Self {
        let store = ContextStore::new();
        let bridge = EventBridge::new();
        let links = link_bridge_to_store(&bridge, &store);
        Self {
            store,
            bridge,
            capabilities: CapabilityRegistry::new(),
            links,
        }
    }

    /// Registers `api` as the SLA source and preload backend.
    pub fn with_api(api: FlowingApi) -> Self {
        let services = Self::new();
        let api = Arc::new(api);
        services.capabilities.register(api.clone());
        services
            .capabilities
            .register::<Arc<dyn SlaSource>>(api.clone());
        services
            .capabilities
            .register::<Arc<dyn PreloadBackend>>(api);
        services
    }

    pub fn sla_source(&self) -> Arc<dyn SlaSource> {
        self.capabilities
            .get_or::<Arc<dyn SlaSource>>(|| Arc::new(MissingSlaSource))
    }

    pub fn preload_backend(&self) -> Arc<dyn PreloadBackend> {
        self.capabilities
            .get_or::<Arc<dyn PreloadBackend>>(|| Arc::new(MissingPreloadBackend))
    }

    pub fn api(&self) -> Option<Arc<FlowingApi>> {
        self.capabilities.get()
    }

    pub fn select_issue(&self, issue: Option<&IssueKey>) {
        self.bridge.emit(
            events::TICKET_SELECTED,
            serde_json::json!({ "issue": issue.map(IssueKey::as_str) }),
        );
    }

    /// Detaches the bridge handlers installed by `new`.
    pub fn shutdown(&self) {
        for link in &self.links {
            link.unsubscribe();
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

fn link_bridge_to_store(bridge: &EventBridge, store: &ContextStore) -> Vec<Subscription> {
    let selection_store = store.clone();
    let on_ticket = bridge.on(events::TICKET_SELECTED, move |payload| {
        let issue = match payload.get("issue") {
            Some(Value::String(issue)) if !issue.trim().is_empty() => {
                Some(IssueKey::new(issue.trim()))
            }
            Some(Value::String(_) | Value::Null) | None => None,
            Some(other) => return Err(anyhow!("unexpected ticket-selected payload: {other}")),
        };
        debug!(issue = ?issue, "ticket selected");
        selection_store.set_state(select_issue(issue.as_ref()));
        Ok(())
    });

    let view_store = store.clone();
    let on_view = bridge.on(events::VIEW_CHANGED, move |payload| {
        let Value::Object(fields) = payload else {
            return Err(anyhow!("view-changed payload must be an object"));
        };
        let update: State = VIEW_KEYS
            .iter()
            .filter_map(|key| fields.get(*key).map(|value| (*key, value.clone())))
            .collect();
        view_store.set_state(update);
        Ok(())
    });

    vec![on_ticket, on_view]
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
