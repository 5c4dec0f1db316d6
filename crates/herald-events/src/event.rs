//! Event model
//!
//! Any `Send + Sync + 'static` type can be an event by implementing [`Event`]. Events
//! that support cooperative cancellation also implement [`StoppableEvent`] and return
//! themselves from [`Event::as_stoppable`].

use std::any::{type_name, Any};
use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type-erasure helpers, implemented for every sized `Send + Sync + 'static` type
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn any_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// An object that can be dispatched to listeners.
///
/// The event's runtime type is its default [`EventKey`].
///
/// ```rust
/// use herald_events::{Event, EventKey, Propagation, StoppableEvent};
///
/// #[derive(Debug, Default)]
/// struct UserRegistered {
///     email: String,
///     propagation: Propagation,
/// }
///
/// impl Event for UserRegistered {
///     fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
///         Some(&self.propagation)
///     }
/// }
///
/// let mut event = UserRegistered::default();
/// assert!(!(&event as &dyn Event).is_propagation_stopped());
/// event.propagation.stop();
/// assert!((&event as &dyn Event).is_propagation_stopped());
/// assert_eq!(EventKey::of::<UserRegistered>(), EventKey::of_event(&event));
/// ```
pub trait Event: AsAny {
    /// Cancellation capability, if the event supports it
    fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
        None
    }
}

impl dyn Event {
    /// Runtime type name of the event
    pub fn type_name(&self) -> &'static str {
        AsAny::any_type_name(self)
    }

    pub fn is<E: Event>(&self) -> bool {
        AsAny::as_any(self).is::<E>()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        AsAny::as_any(self).downcast_ref::<E>()
    }

    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        AsAny::as_any_mut(self).downcast_mut::<E>()
    }

    /// True if the event is stoppable and a listener stopped it
    pub fn is_propagation_stopped(&self) -> bool {
        self.as_stoppable()
            .is_some_and(|stoppable| stoppable.is_propagation_stopped())
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Event").field(&self.type_name()).finish()
    }
}

/// Cooperative cancellation capability
pub trait StoppableEvent {
    /// Once true, no further listener is invoked for this dispatch
    fn is_propagation_stopped(&self) -> bool;
}

/// Reusable stop flag for events that embed it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
    stopped: bool,
}

impl Propagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop propagation to any later listener
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl StoppableEvent for Propagation {
    fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }
}

/// Key under which listeners are registered and looked up.
///
/// Either an explicit event name or the event's runtime type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKey(String);

impl EventKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Key of the event type `E`
    pub fn of<E: Event>() -> Self {
        Self(type_name::<E>().to_string())
    }

    /// Key of an event's runtime type
    pub fn of_event(event: &dyn Event) -> Self {
        Self(event.type_name().to_string())
    }

    /// The explicit name if given, else the event's runtime type
    pub fn resolve(event: &dyn Event, name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::new(name),
            None => Self::of_event(event),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&EventKey> for EventKey {
    fn from(key: &EventKey) -> Self {
        key.clone()
    }
}

impl Borrow<str> for EventKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An event viewed under an explicit name
///
/// Providers receive this view for the named half of a dispatch. The name falls back
/// to the event's type when none is given.
#[derive(Debug, Clone)]
pub struct NamedEvent<'a> {
    key: EventKey,
    event: &'a dyn Event,
}

impl<'a> NamedEvent<'a> {
    pub fn new(event: &'a dyn Event, name: Option<&str>) -> Self {
        Self {
            key: EventKey::resolve(event, name),
            event,
        }
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.as_str()
    }

    /// The wrapped event
    pub fn event(&self) -> &'a dyn Event {
        self.event
    }
}
