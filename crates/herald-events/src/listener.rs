//! Listener handles
//!
//! A [`Listener`] is a cheap, cloneable handle around a callback. Every listener has a
//! [`ListenerId`]; the dispatcher uses it to run a listener once per dispatch even
//! when several providers, or both the typed and the named lookup, return it.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use herald_container::Container;

use crate::error::{EventError, EventResult};
use crate::event::Event;

/// Outcome of one listener invocation
pub type ListenerResult = anyhow::Result<()>;

type Callback = dyn Fn(&mut dyn Event) -> ListenerResult + Send + Sync;

/// Method name used for lazy listeners when none is configured
pub const DEFAULT_METHOD: &str = "invoke";

/// Identity of a listener
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerId {
    /// A callback; clones of one listener share its sequence number
    Callable(u64),
    /// A handler instance bound to one of its methods.
    ///
    /// `subscriber` is the handler's address, which stays unique while the listener
    /// holding the handler is alive.
    Method { subscriber: usize, method: Arc<str> },
    /// A handler resolved lazily from a container
    Service { id: Arc<str>, method: Arc<str> },
}

/// Named handler that routes events to methods by name.
///
/// Subscribers and container-resolved handlers implement this. Unknown method
/// names should fail rather than be ignored.
///
/// ```rust
/// use herald_events::{Event, EventHandler, ListenerResult};
///
/// struct AuditLog;
///
/// impl EventHandler for AuditLog {
///     fn handle(&self, method: &str, _event: &mut dyn Event) -> ListenerResult {
///         match method {
///             "record" => Ok(()),
///             other => anyhow::bail!("AuditLog has no method {other}"),
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Name used in logs and listener names
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Invoke `method` with `event`
    fn handle(&self, method: &str, event: &mut dyn Event) -> ListenerResult;
}

/// A callable that reacts to dispatched events
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    name: Arc<str>,
    callback: Arc<Callback>,
}

impl Listener {
    /// Wrap a callback that accepts any event
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn Event) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::Callable(next_sequence()),
            name: Arc::from(type_name::<F>()),
            callback: Arc::new(callback),
        }
    }

    /// Wrap a callback for one event type.
    ///
    /// Invoking the listener with any other event type fails with
    /// [`EventError::EventTypeMismatch`].
    pub fn typed<E, F>(callback: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        let name = type_name::<F>();
        Self::new(move |event: &mut dyn Event| {
            let actual = event.type_name();
            match event.downcast_mut::<E>() {
                Some(event) => callback(event),
                None => Err(EventError::EventTypeMismatch {
                    listener: name.to_string(),
                    expected: type_name::<E>(),
                    actual,
                }
                .into()),
            }
        })
        .with_name(name)
    }

    /// Bind a handler instance to one of its methods
    pub fn method<H>(handler: Arc<H>, method: impl Into<String>) -> Self
    where
        H: EventHandler + ?Sized + 'static,
    {
        let method: Arc<str> = Arc::from(method.into());
        let name = format!("{}::{}", handler.name(), method);
        let id = ListenerId::Method {
            subscriber: Arc::as_ptr(&handler).cast::<()>() as usize,
            method: Arc::clone(&method),
        };
        Self::from_parts(id, name, move |event| handler.handle(&method, event))
    }

    pub(crate) fn from_parts<F>(id: ListenerId, name: impl Into<Arc<str>>, callback: F) -> Self
    where
        F: Fn(&mut dyn Event) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            id,
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    /// Replace the name used in logs and fault reports
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the listener
    pub fn call(&self, event: &mut dyn Event) -> ListenerResult {
        (self.callback)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

fn next_sequence() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Listener whose handler lives in a container under a service identifier.
///
/// The handler is resolved on every invocation; the container caches it, so only the
/// first invocation constructs it. The service must be an `Arc<dyn EventHandler>`, an
/// `Arc<dyn EventSubscriber>` or a [`Listener`].
///
/// [`EventSubscriber`]: crate::EventSubscriber
#[derive(Clone)]
pub struct LazyListener {
    container: Arc<dyn Container>,
    id: Arc<str>,
    method: Arc<str>,
}

impl LazyListener {
    /// Fails with [`EventError::Unsupported`] if the container cannot provide `id`.
    pub fn new(
        container: Arc<dyn Container>,
        id: impl Into<String>,
        method: impl Into<String>,
    ) -> EventResult<Self> {
        let id = id.into();
        let method = method.into();
        if method.is_empty() {
            return Err(EventError::InvalidInput(format!(
                "Lazy listener for service \"{id}\" has an empty method name"
            )));
        }
        if !container.has(&id) {
            return Err(EventError::Unsupported(format!(
                "Service \"{id}\" is not available in the listener container"
            )));
        }
        Ok(Self {
            container,
            id: Arc::from(id),
            method: Arc::from(method),
        })
    }

    pub fn service_id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Resolve the handler and invoke the configured method
    pub fn invoke(&self, event: &mut dyn Event) -> ListenerResult {
        let service = self.container.get(&self.id)?;

        if let Some(handler) = service.downcast_ref::<Arc<dyn EventHandler>>() {
            return handler.handle(&self.method, event);
        }
        if let Some(subscriber) = service.downcast_ref::<Arc<dyn crate::EventSubscriber>>() {
            return subscriber.handle(&self.method, event);
        }
        if let Some(listener) = service.downcast_ref::<Listener>() {
            return listener.call(event);
        }

        Err(EventError::Unsupported(format!(
            "Service \"{}\" is not an event handler",
            self.id
        ))
        .into())
    }

    pub fn into_listener(self) -> Listener {
        let id = ListenerId::Service {
            id: Arc::clone(&self.id),
            method: Arc::clone(&self.method),
        };
        let name = format!("{}::{}", self.id, self.method);
        Listener::from_parts(id, name, move |event| self.invoke(event))
    }
}

impl fmt::Debug for LazyListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyListener")
            .field("id", &self.id)
            .field("method", &self.method)
            .finish()
    }
}

impl From<LazyListener> for Listener {
    fn from(listener: LazyListener) -> Self {
        listener.into_listener()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_container::ServiceContainer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counted {
        hits: usize,
    }

    impl Event for Counted {}

    #[derive(Debug)]
    struct Other;

    impl Event for Other {}

    struct Recorder {
        calls: AtomicUsize,
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn handle(&self, method: &str, event: &mut dyn Event) -> ListenerResult {
            match method {
                "record" => {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    if let Some(counted) = event.downcast_mut::<Counted>() {
                        counted.hits += 1;
                    }
                    Ok(())
                }
                other => anyhow::bail!("recorder has no method {other}"),
            }
        }
    }

    #[test]
    fn test_clones_share_identity() {
        let listener = Listener::new(|_| Ok(()));
        let clone = listener.clone();
        let other = Listener::new(|_| Ok(()));

        assert_eq!(listener.id(), clone.id());
        assert_ne!(listener.id(), other.id());
    }

    #[test]
    fn test_typed_listener_downcasts() {
        let listener = Listener::typed(|event: &mut Counted| {
            event.hits += 1;
            Ok(())
        });

        let mut event = Counted::default();
        listener.call(&mut event).unwrap();
        assert_eq!(event.hits, 1);
    }

    #[test]
    fn test_typed_listener_rejects_other_events() {
        let listener = Listener::typed(|_: &mut Counted| Ok(()));

        let error = listener.call(&mut Other).unwrap_err();
        let error = error.downcast_ref::<EventError>().unwrap();
        assert!(matches!(
            error,
            EventError::EventTypeMismatch { expected, .. } if expected.ends_with("Counted")
        ));
    }

    #[test]
    fn test_method_identity_is_per_instance_and_method() {
        let recorder = Arc::new(Recorder {
            calls: AtomicUsize::new(0),
        });
        let a = Listener::method(Arc::clone(&recorder), "record");
        let b = Listener::method(Arc::clone(&recorder), "record");
        let c = Listener::method(Arc::clone(&recorder), "other");

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.name(), "recorder::record");

        let mut event = Counted::default();
        a.call(&mut event).unwrap();
        assert_eq!(event.hits, 1);
        assert!(c.call(&mut event).is_err());
    }

    #[test]
    fn test_lazy_listener_requires_known_service() {
        let container: Arc<dyn Container> = Arc::new(ServiceContainer::builder().build());
        let result = LazyListener::new(container, "missing", "record");
        assert!(matches!(result, Err(EventError::Unsupported(_))));
    }

    #[test]
    fn test_lazy_listener_resolves_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);

        let mut builder = ServiceContainer::builder();
        builder
            .register("recorder", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                let handler: Arc<dyn EventHandler> = Arc::new(Recorder {
                    calls: AtomicUsize::new(0),
                });
                Ok(handler)
            })
            .unwrap();
        let container: Arc<dyn Container> = Arc::new(builder.build());

        let listener = LazyListener::new(container, "recorder", "record")
            .unwrap()
            .into_listener();
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        let mut event = Counted::default();
        listener.call(&mut event).unwrap();
        listener.call(&mut event).unwrap();

        assert_eq!(event.hits, 2);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(
            listener.id(),
            &ListenerId::Service {
                id: Arc::from("recorder"),
                method: Arc::from("record"),
            }
        );
    }

    #[test]
    fn test_lazy_listener_rejects_non_handlers() {
        let mut builder = ServiceContainer::builder();
        builder.register("number", |_| Ok(7u32)).unwrap();
        let container: Arc<dyn Container> = Arc::new(builder.build());

        let listener = LazyListener::new(container, "number", DEFAULT_METHOD).unwrap();
        let error = listener.invoke(&mut Other).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EventError>(),
            Some(EventError::Unsupported(_))
        ));
    }
}
