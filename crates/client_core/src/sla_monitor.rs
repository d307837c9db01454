//! Keeps the `sla` entry of the context in step with the selected issue.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};

use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    context::{keys, UiContext},
    domain::{IssueKey, SlaStatus},
    protocol::SlaSummary,
    state::State,
};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    api::SlaSource,
    event_bridge::{events, EventBridge},
    listeners::Subscription,
    store::ContextStore,
};

#[derive(Debug, Clone, Serialize)]
struct SlaUpdatedPayload<'a> {
    issue: &'a IssueKey,
    status: SlaStatus,
    sla: Option<&'a SlaSummary>,
}

struct MonitorInner {
    store: ContextStore,
    bridge: EventBridge,
    source: Arc<dyn SlaSource>,
    runtime: Handle,
    /// Bumped for every fetch; only the latest one may write its result.
    generation: AtomicU64,
    stopped: AtomicBool,
    load_task: Mutex<Option<JoinHandle<()>>>,
}

pub struct SlaMonitor {
    inner: Arc<MonitorInner>,
    subscription: Subscription,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SlaMonitor {
    /// Watches `selectedIssue` and fetches SLA data whenever it changes. With
    /// `refresh_interval` set, the selected issue is also re-fetched
    /// periodically.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        store: ContextStore,
        bridge: EventBridge,
        source: Arc<dyn SlaSource>,
        refresh_interval: Option<Duration>,
    ) -> Self {
        let inner = Arc::new(MonitorInner {
            store,
            bridge,
            source,
            runtime: Handle::current(),
            generation: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            load_task: Mutex::new(None),
        });

        let weak: Weak<MonitorInner> = Arc::downgrade(&inner);
        let subscription = inner.store.subscribe(move |next, previous| {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            if next.get(keys::SELECTED_ISSUE) != previous.get(keys::SELECTED_ISSUE) {
                inner.on_selection_changed(UiContext::from_state(next).selected_issue);
            }
            Ok(())
        });

        let refresh_task = refresh_interval.map(|period| {
            let weak = Arc::downgrade(&inner);
            inner.runtime.spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    inner.refresh_selected().await;
                }
            })
        });

        // An issue may already be selected before the monitor came up.
        let selected = UiContext::from_state(&inner.store.get_state()).selected_issue;
        if selected.is_some() {
            inner.on_selection_changed(selected);
        }

        Self {
            inner,
            subscription,
            refresh_task: Mutex::new(refresh_task),
        }
    }

    /// Fetches the currently selected issue now and waits for the result to be
    /// applied.
    pub async fn refresh(&self) {
        self.inner.refresh_selected().await;
    }

    /// Detaches from the store and cancels the refresh timer and any fetch
    /// still in flight. Nothing is written to the store afterwards.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.subscription.unsubscribe();
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.inner.cancel_load();
    }
}

impl MonitorInner {
    fn on_selection_changed(self: &Arc<Self>, selected: Option<IssueKey>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        self.cancel_load();
        let Some(issue) = selected else {
            self.next_generation();
            self.store.set_state(
                State::new()
                    .with(keys::SLA, Value::Null)
                    .with(keys::SLA_STATUS, Value::Null),
            );
            return;
        };

        self.store.set_state(
            State::new()
                .with(keys::SLA, Value::Null)
                .with(keys::SLA_STATUS, status_value(SlaStatus::Loading)),
        );
        let generation = self.next_generation();
        let inner = self.clone();
        let task = self.runtime.spawn(async move {
            inner.load(issue, generation).await;
        });
        *self.lock_load_task() = Some(task);
    }

    async fn refresh_selected(&self) {
        let selected = UiContext::from_state(&self.store.get_state()).selected_issue;
        if let Some(issue) = selected {
            let generation = self.next_generation();
            self.load(issue, generation).await;
        }
    }

    async fn load(&self, issue: IssueKey, generation: u64) {
        let result = self.source.issue_sla(&issue).await;

        // The selection may have moved on, or a newer fetch may have started,
        // while the request was in flight.
        if !self.is_current(&issue, generation) {
            debug!(issue = %issue, generation, "discarding stale sla response");
            return;
        }

        let (status, summary) = match result {
            Ok(data) => (SlaStatus::Ready, data.summary()),
            Err(err) => {
                warn!(issue = %issue, error = %format!("{err:#}"), "sla unavailable");
                (SlaStatus::Unavailable, None)
            }
        };

        self.store.set_state(
            State::new()
                .with(keys::SLA, summary.as_ref().map_or(Value::Null, to_value))
                .with(keys::SLA_STATUS, status_value(status)),
        );
        info!(issue = %issue, ?status, has_sla = summary.is_some(), "sla applied");
        self.bridge.emit_json(
            events::SLA_UPDATED,
            &SlaUpdatedPayload {
                issue: &issue,
                status,
                sla: summary.as_ref(),
            },
        );
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, issue: &IssueKey, generation: u64) -> bool {
        !self.stopped.load(Ordering::Acquire)
            && self.generation.load(Ordering::Acquire) == generation
            && UiContext::from_state(&self.store.get_state())
                .selected_issue
                .as_ref()
                == Some(issue)
    }

    fn cancel_load(&self) {
        if let Some(task) = self.lock_load_task().take() {
            task.abort();
        }
    }

    fn lock_load_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.load_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn status_value(status: SlaStatus) -> Value {
    to_value(&status)
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize context value");
        json!(null)
    })
}

#[cfg(test)]
#[path = "tests/sla_monitor_tests.rs"]
mod tests;
