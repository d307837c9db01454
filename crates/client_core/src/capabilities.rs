use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tracing::debug;

/// Typed registry of optional collaborators.
///
/// Values are keyed by their type, so a capability is usually registered as a
/// shared trait object such as `Arc<dyn SlaSource>`.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value`, returning the capability it replaced.
    pub fn register<T>(&self, value: T) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        debug!(capability = type_name::<T>(), "registering capability");
        let previous = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(TypeId::of::<T>(), Box::new(value));
        previous.and_then(|boxed| boxed.downcast::<T>().ok().map(|value| *value))
    }

    pub fn get<T>(&self) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    pub fn get_or<T>(&self, fallback: impl FnOnce() -> T) -> T
    where
        T: Any + Clone + Send + Sync,
    {
        self.get().unwrap_or_else(fallback)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T>(&self) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok().map(|value| *value))
    }
}
