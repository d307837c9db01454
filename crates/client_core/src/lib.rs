//! Coordination core of the Flowing service-desk dashboard: the reactive
//! context store, the event bridge, footer suggestion rotation and the
//! services that keep SLA and ML preload state current.

pub mod api;
pub mod capabilities;
pub mod error;
pub mod event_bridge;
mod listeners;
pub mod ml_preload;
pub mod rotator;
pub mod services;
pub mod sla_monitor;
pub mod store;
pub mod suggestions;

pub use api::{FlowingApi, MissingPreloadBackend, MissingSlaSource, PreloadBackend, SlaSource};
pub use capabilities::CapabilityRegistry;
pub use error::ClientError;
pub use event_bridge::{events, EventBridge};
pub use listeners::{Subscription, SubscriptionId};
pub use ml_preload::MlPreloadMonitor;
pub use rotator::{Feed, Rotation, RotationPhase, RotatorHandle, SuggestionRotator};
pub use services::Services;
pub use sla_monitor::SlaMonitor;
pub use store::{ContextStore, KeyedStateContainer};
