//! Footer suggestion rotation.
//!
//! `Rotation` is the timer-free state machine; `SuggestionRotator` drives it
//! from a tokio interval.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use shared::suggestion::Suggestion;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, trace, warn};

pub const LOADING_TEXT: &str = "Analyzing ticket context...";
pub const EMPTY_TEXT: &str = "No suggestions right now";
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// What the suggestion source currently has to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Loading,
    Ready(Vec<Suggestion>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPhase {
    Loading,
    Idle { empty: bool },
    Cycling,
}

#[derive(Debug, Clone)]
pub struct Rotation {
    phase: RotationPhase,
    index: usize,
    displayed: Option<Suggestion>,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            phase: RotationPhase::Loading,
            index: 0,
            displayed: None,
        }
    }
}

impl Rotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RotationPhase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn displayed(&self) -> Option<&Suggestion> {
        self.displayed.as_ref()
    }

    /// Advances one tick. Returns the suggestion to render, or `None` when the
    /// display should stay as it is.
    pub fn advance(&mut self, feed: Feed) -> Option<Suggestion> {
        let suggestions = match feed {
            Feed::Loading => {
                self.phase = RotationPhase::Loading;
                self.index = 0;
                return self.show(Suggestion::info(LOADING_TEXT));
            }
            Feed::Ready(suggestions) if suggestions.is_empty() => {
                self.phase = RotationPhase::Idle { empty: true };
                self.index = 0;
                return self.show(Suggestion::empty(EMPTY_TEXT));
            }
            Feed::Ready(suggestions) => suggestions,
        };

        match self.phase {
            RotationPhase::Loading | RotationPhase::Idle { empty: true } => {
                self.phase = RotationPhase::Idle { empty: false };
                self.index = 0;
                self.show(suggestions[0].clone())
            }
            RotationPhase::Idle { empty: false } | RotationPhase::Cycling => {
                self.phase = RotationPhase::Cycling;
                let len = suggestions.len();
                let start = (self.index + 1) % len;
                let next = (0..len)
                    .map(|offset| (start + offset) % len)
                    .find(|&candidate| !self.is_displayed(&suggestions[candidate]))?;
                self.index = next;
                self.show(suggestions[next].clone())
            }
        }
    }

    fn is_displayed(&self, suggestion: &Suggestion) -> bool {
        self.displayed
            .as_ref()
            .is_some_and(|displayed| displayed.key == suggestion.key)
    }

    fn show(&mut self, suggestion: Suggestion) -> Option<Suggestion> {
        if self.is_displayed(&suggestion) {
            return None;
        }
        self.displayed = Some(suggestion.clone());
        Some(suggestion)
    }
}

pub struct SuggestionRotator;

impl SuggestionRotator {
    /// Evaluates `source` immediately, then every `interval`, rendering
    /// through `display` whenever the shown suggestion changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, D>(mut source: S, interval: Duration, mut display: D) -> RotatorHandle
    where
        S: FnMut() -> Feed + Send + 'static,
        D: FnMut(&Suggestion) + Send + 'static,
    {
        let interval = if interval < MIN_INTERVAL {
            warn!(?interval, "rotation interval too small; clamping");
            MIN_INTERVAL
        } else {
            interval
        };

        let paused = Arc::new(AtomicBool::new(false));
        let mut rotation = Rotation::new();
        if let Some(suggestion) = rotation.advance(source()) {
            display(&suggestion);
        }

        let task_paused = paused.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if task_paused.load(Ordering::Acquire) {
                    trace!("rotation paused; skipping tick");
                    continue;
                }
                if let Some(suggestion) = rotation.advance(source()) {
                    display(&suggestion);
                }
            }
        });

        RotatorHandle {
            paused,
            task: Mutex::new(Some(task)),
        }
    }
}

pub struct RotatorHandle {
    paused: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RotatorHandle {
    /// Paused ticks neither advance the rotation nor render.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            debug!("suggestion rotation stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
#[path = "tests/rotator_tests.rs"]
mod tests;
