//! Priority-bucket listener registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use herald_container::Container;
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::event::EventKey;
use crate::listener::{LazyListener, Listener};

use super::{
    EventSubscriber, ListenerDescriptor, ListenerOrigin, ListenerProvider, ListenerTarget,
    Listeners, PriorityBucket,
};

/// Listener registry keyed by [`EventKey`]
///
/// Registrations happen while the registry is being assembled; once it is shared
/// behind an `Arc` it is read-only. Lazy service listeners need a container, set with
/// [`ListenerRegistry::with_container`].
#[derive(Default)]
pub struct ListenerRegistry {
    buckets: HashMap<EventKey, PriorityBucket>,
    container: Option<Arc<dyn Container>>,
    len: usize,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that resolves lazy listeners from `container`
    pub fn with_container(container: Arc<dyn Container>) -> Self {
        Self {
            container: Some(container),
            ..Self::default()
        }
    }

    /// Register a callable under `event` at `priority`
    pub fn listen(
        &mut self,
        event: impl Into<EventKey>,
        listener: Listener,
        priority: i32,
    ) -> &mut Self {
        let descriptor = ListenerDescriptor::callable(event, listener.clone(), priority)
            .with_origin(ListenerOrigin::Callable);
        self.insert(descriptor, listener);
        self
    }

    /// Register a lazy handler method under `event`.
    ///
    /// Fails with [`EventError::Unsupported`] when the registry has no container or the
    /// container does not know `id`.
    pub fn listen_service(
        &mut self,
        event: impl Into<EventKey>,
        id: impl Into<String>,
        method: impl Into<String>,
        priority: i32,
    ) -> EventResult<&mut Self> {
        let descriptor = ListenerDescriptor::service(event, id, method, priority)
            .with_origin(ListenerOrigin::Service);
        self.listen_descriptor(descriptor)
    }

    /// Register a pre-normalized descriptor, keeping its origin
    pub fn listen_descriptor(&mut self, descriptor: ListenerDescriptor) -> EventResult<&mut Self> {
        let listener = match descriptor.target() {
            ListenerTarget::Callable(listener) => listener.clone(),
            ListenerTarget::Service { id, method } => self.lazy(id, method)?.into_listener(),
        };
        self.insert(descriptor, listener);
        Ok(self)
    }

    /// Register every route a subscriber declares.
    ///
    /// The whole route table is validated before anything is inserted. Returns the
    /// number of registered listeners.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) -> EventResult<usize> {
        let routes = subscriber.subscribed_events().normalize().map_err(|error| match error {
            EventError::InvalidInput(reason) => EventError::InvalidInput(format!(
                "Subscriber \"{}\": {}",
                subscriber.name(),
                reason
            )),
            other => other,
        })?;

        let count = routes.len();
        for (event_key, method, priority) in routes {
            let listener = Listener::method(Arc::clone(&subscriber), method);
            let descriptor = ListenerDescriptor::callable(event_key, listener.clone(), priority)
                .with_origin(ListenerOrigin::Subscriber);
            self.insert(descriptor, listener);
        }

        debug!(
            subscriber = subscriber.name(),
            listeners = count,
            "Registered event subscriber"
        );
        Ok(count)
    }

    /// Descriptors registered under `key`, in invocation order
    pub fn descriptors<'a>(
        &'a self,
        key: &EventKey,
    ) -> impl Iterator<Item = &'a ListenerDescriptor> + 'a {
        self.buckets
            .get(key)
            .into_iter()
            .flat_map(|bucket| bucket.descriptors())
    }

    /// Every key with at least one listener
    pub fn event_keys(&self) -> impl Iterator<Item = &EventKey> + '_ {
        self.buckets.keys()
    }

    /// Bucket for `key`, if any listener is registered under it
    pub fn bucket(&self, key: &EventKey) -> Option<&PriorityBucket> {
        self.buckets.get(key)
    }

    /// Total number of registered listeners
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn lazy(&self, id: &str, method: &str) -> EventResult<LazyListener> {
        let container = self.container.as_ref().ok_or_else(|| {
            EventError::Unsupported(format!(
                "Lazy listener \"{id}::{method}\" needs a listener container"
            ))
        })?;
        LazyListener::new(Arc::clone(container), id, method)
    }

    fn insert(&mut self, descriptor: ListenerDescriptor, listener: Listener) {
        debug!(
            event_key = %descriptor.event_key(),
            listener = listener.name(),
            priority = descriptor.priority(),
            origin = ?descriptor.origin(),
            "Registered listener"
        );
        self.buckets
            .entry(descriptor.event_key().clone())
            .or_default()
            .insert(descriptor, listener);
        self.len += 1;
    }
}

impl ListenerProvider for ListenerRegistry {
    fn listeners_for(&self, key: &EventKey) -> Listeners<'_> {
        match self.buckets.get(key) {
            Some(bucket) => Box::new(bucket.listeners().cloned()),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("event_keys", &self.buckets.len())
            .field("listeners", &self.len)
            .field("lazy", &self.container.is_some())
            .finish()
    }
}
