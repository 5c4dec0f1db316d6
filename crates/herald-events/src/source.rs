//! Registration sources
//!
//! [`ListenerSource`] is the closed set of things that can contribute listeners to an
//! [`EventDispatcherContainer`](crate::EventDispatcherContainer). Each source is
//! classified once, by [`ListenerSource::kind`], into the registry that will hold it.

use std::fmt;
use std::sync::Arc;

use crate::event::{Event, EventKey};
use crate::listener::{Listener, ListenerResult, DEFAULT_METHOD};
use crate::registry::{EventSubscriber, ListenerDescriptor, ListenerProvider};

/// One registration source
#[derive(Clone)]
pub enum ListenerSource {
    /// A ready callable for one event key
    Callable {
        event: EventKey,
        listener: Listener,
        priority: i32,
    },
    /// A handler method resolved lazily from the delegate container
    Service {
        event: EventKey,
        id: String,
        method: String,
        priority: i32,
    },
    /// A pre-normalized descriptor, as produced by metadata extraction
    Descriptor(ListenerDescriptor),
    /// A subscriber instance
    Subscriber(Arc<dyn EventSubscriber>),
    /// A subscriber resolved from the delegate container by identifier
    SubscriberService(String),
    /// A complete provider, consulted before every registry
    Provider(Arc<dyn ListenerProvider>),
}

/// Which registry a source ends up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Descriptors with explicit priorities
    Prioritized,
    /// Callables and lazy service listeners
    Callable,
    /// Subscribers and subscriber services
    Subscriber,
    /// User-supplied providers
    Provider,
}

impl ListenerSource {
    /// A callable at priority 0
    pub fn callable(event: impl Into<EventKey>, listener: Listener) -> Self {
        Self::callable_with_priority(event, listener, 0)
    }

    pub fn callable_with_priority(
        event: impl Into<EventKey>,
        listener: Listener,
        priority: i32,
    ) -> Self {
        ListenerSource::Callable {
            event: event.into(),
            listener,
            priority,
        }
    }

    /// A callable keyed by the event type it accepts
    pub fn typed<E, F>(callback: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        Self::callable(EventKey::of::<E>(), Listener::typed(callback))
    }

    /// A lazy listener calling [`DEFAULT_METHOD`] on the service `id`
    pub fn service(event: impl Into<EventKey>, id: impl Into<String>) -> Self {
        Self::service_method(event, id, DEFAULT_METHOD, 0)
    }

    pub fn service_method(
        event: impl Into<EventKey>,
        id: impl Into<String>,
        method: impl Into<String>,
        priority: i32,
    ) -> Self {
        ListenerSource::Service {
            event: event.into(),
            id: id.into(),
            method: method.into(),
            priority,
        }
    }

    pub fn subscriber(subscriber: Arc<dyn EventSubscriber>) -> Self {
        ListenerSource::Subscriber(subscriber)
    }

    pub fn provider(provider: Arc<dyn ListenerProvider>) -> Self {
        ListenerSource::Provider(provider)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ListenerSource::Descriptor(_) => SourceKind::Prioritized,
            ListenerSource::Callable { .. } | ListenerSource::Service { .. } => SourceKind::Callable,
            ListenerSource::Subscriber(_) | ListenerSource::SubscriberService(_) => {
                SourceKind::Subscriber
            }
            ListenerSource::Provider(_) => SourceKind::Provider,
        }
    }
}

impl From<ListenerDescriptor> for ListenerSource {
    fn from(descriptor: ListenerDescriptor) -> Self {
        ListenerSource::Descriptor(descriptor)
    }
}

impl fmt::Debug for ListenerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerSource::Callable {
                event,
                listener,
                priority,
            } => f
                .debug_struct("Callable")
                .field("event", event)
                .field("listener", &listener.name())
                .field("priority", priority)
                .finish(),
            ListenerSource::Service {
                event,
                id,
                method,
                priority,
            } => f
                .debug_struct("Service")
                .field("event", event)
                .field("id", id)
                .field("method", method)
                .field("priority", priority)
                .finish(),
            ListenerSource::Descriptor(descriptor) => {
                f.debug_tuple("Descriptor").field(descriptor).finish()
            }
            ListenerSource::Subscriber(subscriber) => {
                f.debug_tuple("Subscriber").field(&subscriber.name()).finish()
            }
            ListenerSource::SubscriberService(id) => {
                f.debug_tuple("SubscriberService").field(id).finish()
            }
            ListenerSource::Provider(_) => f.write_str("Provider"),
        }
    }
}
