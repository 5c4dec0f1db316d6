//! Listener registries and the provider interface
//!
//! A [`ListenerProvider`] answers "which listeners run for this event key", in order.
//! [`ListenerRegistry`] is the provider built from registrations: it normalizes
//! callables, lazy service listeners, pre-built descriptors and subscriber route
//! tables into [`ListenerDescriptor`]s, and keeps one [`PriorityBucket`] per key.
//!
//! # Examples
//!
//! ```rust
//! use herald_events::{Event, Listener, ListenerProvider, ListenerRegistry};
//!
//! #[derive(Debug)]
//! struct Saved;
//! impl Event for Saved {}
//!
//! let mut registry = ListenerRegistry::new();
//! registry
//!     .listen("saved", Listener::new(|_| Ok(())).with_name("low"), -5)
//!     .listen("saved", Listener::new(|_| Ok(())).with_name("high"), 10);
//!
//! let names: Vec<String> = registry
//!     .listeners_for(&"saved".into())
//!     .map(|listener| listener.name().to_string())
//!     .collect();
//! assert_eq!(names, ["high", "low"]);
//! ```

pub mod bucket;
pub mod storage;
pub mod subscriber;

pub use bucket::PriorityBucket;
pub use storage::ListenerRegistry;
pub use subscriber::{EventSubscriber, MethodSpec, SubscriptionTable};

use std::sync::Arc;

use crate::event::{Event, EventKey, NamedEvent};
use crate::listener::Listener;

/// Lazy sequence of listeners, in invocation order
pub type Listeners<'a> = Box<dyn Iterator<Item = Listener> + 'a>;

/// Source of listeners for an event.
///
/// Lookups are restartable: each call returns a fresh sequence. Unknown keys yield an
/// empty sequence.
pub trait ListenerProvider: Send + Sync {
    /// Listeners registered under `key`
    fn listeners_for(&self, key: &EventKey) -> Listeners<'_>;

    /// Listeners for the event's runtime type
    fn listeners_for_event(&self, event: &dyn Event) -> Listeners<'_> {
        self.listeners_for(&EventKey::of_event(event))
    }

    /// Listeners for the name of a named view
    fn listeners_for_named(&self, named: &NamedEvent<'_>) -> Listeners<'_> {
        self.listeners_for(named.key())
    }
}

impl<P: ListenerProvider + ?Sized> ListenerProvider for Arc<P> {
    fn listeners_for(&self, key: &EventKey) -> Listeners<'_> {
        (**self).listeners_for(key)
    }

    fn listeners_for_event(&self, event: &dyn Event) -> Listeners<'_> {
        (**self).listeners_for_event(event)
    }

    fn listeners_for_named(&self, named: &NamedEvent<'_>) -> Listeners<'_> {
        (**self).listeners_for_named(named)
    }
}

/// What a descriptor invokes
#[derive(Debug, Clone)]
pub enum ListenerTarget {
    /// A listener that is ready to call
    Callable(Listener),
    /// A handler method resolved from a container on first invocation
    Service { id: String, method: String },
}

/// How a descriptor was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerOrigin {
    Callable,
    Service,
    Subscriber,
    Descriptor,
}

/// A normalized registration: which key, what to call, at which priority
#[derive(Debug, Clone)]
pub struct ListenerDescriptor {
    event_key: EventKey,
    target: ListenerTarget,
    priority: i32,
    origin: ListenerOrigin,
}

impl ListenerDescriptor {
    pub fn new(event_key: impl Into<EventKey>, target: ListenerTarget, priority: i32) -> Self {
        Self {
            event_key: event_key.into(),
            target,
            priority,
            origin: ListenerOrigin::Descriptor,
        }
    }

    /// Descriptor for a ready callable
    pub fn callable(event_key: impl Into<EventKey>, listener: Listener, priority: i32) -> Self {
        Self::new(event_key, ListenerTarget::Callable(listener), priority)
    }

    /// Descriptor for a lazily resolved handler method
    pub fn service(
        event_key: impl Into<EventKey>,
        id: impl Into<String>,
        method: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self::new(
            event_key,
            ListenerTarget::Service {
                id: id.into(),
                method: method.into(),
            },
            priority,
        )
    }

    pub(crate) fn with_origin(mut self, origin: ListenerOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn event_key(&self) -> &EventKey {
        &self.event_key
    }

    pub fn target(&self) -> &ListenerTarget {
        &self.target
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn origin(&self) -> ListenerOrigin {
        self.origin
    }
}
