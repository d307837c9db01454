use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::warn;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handle returned by `subscribe`/`on`.
///
/// Dropping the handle keeps the callback registered; only `unsubscribe`
/// removes it. Calling `unsubscribe` more than once is a no-op.
pub struct Subscription {
    id: SubscriptionId,
    detach: Box<dyn Fn(SubscriptionId) + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        detach: impl Fn(SubscriptionId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            detach: Box::new(detach),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(&self) {
        (self.detach)(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Registration-ordered callback list.
pub(crate) struct ListenerSet<F: ?Sized> {
    entries: Vec<(SubscriptionId, Arc<F>)>,
}

impl<F: ?Sized> Default for ListenerSet<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> ListenerSet<F> {
    pub(crate) fn insert(&mut self, callback: Arc<F>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.push((id, callback));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub(crate) fn snapshot(&self) -> Vec<(SubscriptionId, Arc<F>)> {
        self.entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs one callback so that an error or panic is logged and contained.
/// Returns whether the callback completed successfully.
pub(crate) fn run_isolated(
    kind: &'static str,
    id: SubscriptionId,
    callback: impl FnOnce() -> anyhow::Result<()>,
) -> bool {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(listener = %id, kind, error = %format!("{err:#}"), "listener returned an error");
            false
        }
        Err(payload) => {
            warn!(listener = %id, kind, panic = %panic_message(payload.as_ref()), "listener panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
