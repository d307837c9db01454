use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::Result;
use serde_json::json;
use shared::{context::keys, protocol::MlPreloadStatus, state::State};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    api::PreloadBackend,
    error::ClientError,
    event_bridge::{events, EventBridge},
    store::ContextStore,
};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Starts and follows the backend's ML model preload, mirroring progress into
/// the `mlPreload` context key.
pub struct MlPreloadMonitor {
    backend: Arc<dyn PreloadBackend>,
    store: ContextStore,
    bridge: EventBridge,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MlPreloadMonitor {
    pub fn new(
        backend: Arc<dyn PreloadBackend>,
        store: ContextStore,
        bridge: EventBridge,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            bridge,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            task: Mutex::new(None),
        }
    }

    /// Asks the backend to start preloading, then follows progress.
    ///
    /// A failed start is recorded in the context and returned; polling is not
    /// started in that case.
    pub async fn trigger(&self) -> Result<String> {
        match self.backend.start_preload().await {
            Ok(message) => {
                info!(%message, "ml preload requested");
                self.watch();
                Ok(message)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ml preload request failed");
                publish(
                    &self.store,
                    &self.bridge,
                    &MlPreloadStatus {
                        progress: 0.0,
                        is_loading: false,
                        message: "ML preload could not be started".to_string(),
                        error: Some(err.to_string()),
                    },
                );
                Err(err.context("failed to start ml preload"))
            }
        }
    }

    /// Polls status until the backend reports the preload finished. A second
    /// call while polling is a no-op.
    pub fn watch(&self) {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("ml preload already being watched");
            return;
        }

        let backend = self.backend.clone();
        let store = self.store.clone();
        let bridge = self.bridge.clone();
        let period = self.poll_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(status) = poll(backend.as_ref(), &store, &bridge).await else {
                    continue;
                };
                if status.is_finished() {
                    info!(
                        progress = status.progress_percent(),
                        error = status.error.as_deref().unwrap_or(""),
                        "ml preload finished"
                    );
                    return;
                }
            }
        }));
    }

    /// Single status poll; `None` when the backend could not be reached.
    pub async fn poll_once(&self) -> Option<MlPreloadStatus> {
        poll(self.backend.as_ref(), &self.store, &self.bridge).await
    }

    pub fn is_polling(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn poll(
    backend: &dyn PreloadBackend,
    store: &ContextStore,
    bridge: &EventBridge,
) -> Option<MlPreloadStatus> {
    match backend.preload_status().await {
        Ok(status) => {
            publish(store, bridge, &status);
            Some(status)
        }
        Err(err) => {
            // Next tick retries.
            if is_transient(&err) {
                debug!(error = %format!("{err:#}"), "ml preload status temporarily unavailable");
            } else {
                warn!(error = %format!("{err:#}"), "ml preload status unavailable");
            }
            None
        }
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_transient)
    })
}

fn publish(store: &ContextStore, bridge: &EventBridge, status: &MlPreloadStatus) {
    let value = serde_json::to_value(status).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize ml preload status");
        json!(null)
    });
    store.set_state(State::new().with(keys::ML_PRELOAD, value.clone()));
    bridge.emit(events::ML_PRELOAD_PROGRESS, value);
}

#[cfg(test)]
#[path = "tests/ml_preload_tests.rs"]
mod tests;
