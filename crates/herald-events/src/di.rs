//! Container wiring for the event dispatcher
//!
//! [`EventDispatcherServiceProvider`] turns a list of [`ListenerSource`]s into
//! container services: one registry per source kind, an aggregate provider that
//! chains them and the dispatcher itself. [`EventDispatcherContainer`] builds those
//! services eagerly, so malformed registrations fail at construction instead of on
//! the first dispatch.

use std::fmt;
use std::sync::Arc;

use herald_container::{
    Container, ContainerError, ContainerExt, ContainerResult, Service, ServiceContainer,
    ServiceContainerBuilder, ServiceProvider,
};
use tracing::{debug, info};

use crate::dispatcher::EventDispatcher;
use crate::error::{EventError, EventResult};
use crate::provider::ListenerProviderAggregate;
use crate::registry::{EventSubscriber, ListenerProvider, ListenerRegistry};
use crate::source::{ListenerSource, SourceKind};

/// Service identifiers registered by [`EventDispatcherServiceProvider`]
pub mod ids {
    /// Registry of pre-normalized descriptors
    pub const PRIORITIZED: &str = "herald.listener_provider.prioritized";
    /// Registry of callables and lazy service listeners
    pub const CALLABLES: &str = "herald.listener_provider.callables";
    /// Registry built from subscribers
    pub const SUBSCRIBERS: &str = "herald.listener_provider.subscribers";
    /// Aggregate of user providers and the three registries
    pub const AGGREGATE: &str = "herald.listener_provider.aggregate";
    /// Alias of [`AGGREGATE`]
    pub const LISTENER_PROVIDER: &str = "herald.listener_provider";
    pub const EVENT_DISPATCHER: &str = "herald.event_dispatcher";
    /// Delegate entry holding a `Vec<ListenerSource>` used when no sources are given
    pub const CONFIG_LISTENERS: &str = "config.listeners";
}

/// Sources split by the registry they belong to
#[derive(Default)]
struct Partitioned {
    prioritized: Vec<ListenerSource>,
    callables: Vec<ListenerSource>,
    subscribers: Vec<ListenerSource>,
    providers: Vec<Arc<dyn ListenerProvider>>,
}

impl Partitioned {
    fn new(sources: Vec<ListenerSource>) -> Self {
        let mut partitioned = Self::default();
        for source in sources {
            match (source.kind(), source) {
                (_, ListenerSource::Provider(provider)) => partitioned.providers.push(provider),
                (SourceKind::Prioritized, source) => partitioned.prioritized.push(source),
                (SourceKind::Subscriber, source) => partitioned.subscribers.push(source),
                (_, source) => partitioned.callables.push(source),
            }
        }
        partitioned
    }
}

/// Registers listener registries, the aggregate provider and the dispatcher.
///
/// Lazy listeners and subscriber services are resolved from `delegate`, which is
/// always supplied by the caller.
pub struct EventDispatcherServiceProvider {
    sources: Arc<Partitioned>,
    delegate: Arc<dyn Container>,
}

impl EventDispatcherServiceProvider {
    pub fn new(sources: Vec<ListenerSource>, delegate: Arc<dyn Container>) -> Self {
        Self {
            sources: Arc::new(Partitioned::new(sources)),
            delegate,
        }
    }
}

impl ServiceProvider for EventDispatcherServiceProvider {
    fn name(&self) -> &'static str {
        "event_dispatcher"
    }

    fn register(&self, builder: &mut ServiceContainerBuilder) -> ContainerResult<()> {
        let sources = Arc::clone(&self.sources);
        let delegate = Arc::clone(&self.delegate);
        builder.register(ids::PRIORITIZED, move |_| {
            let mut registry = ListenerRegistry::with_container(Arc::clone(&delegate));
            for source in &sources.prioritized {
                if let ListenerSource::Descriptor(descriptor) = source {
                    registry.listen_descriptor(descriptor.clone())?;
                }
            }
            Ok(registry)
        })?;

        let sources = Arc::clone(&self.sources);
        let delegate = Arc::clone(&self.delegate);
        builder.register(ids::CALLABLES, move |_| {
            let mut registry = ListenerRegistry::with_container(Arc::clone(&delegate));
            for source in &sources.callables {
                match source {
                    ListenerSource::Callable {
                        event,
                        listener,
                        priority,
                    } => {
                        registry.listen(event, listener.clone(), *priority);
                    }
                    ListenerSource::Service {
                        event,
                        id,
                        method,
                        priority,
                    } => {
                        registry.listen_service(event, id.as_str(), method.as_str(), *priority)?;
                    }
                    _ => {}
                }
            }
            Ok(registry)
        })?;

        let sources = Arc::clone(&self.sources);
        let delegate = Arc::clone(&self.delegate);
        builder.register(ids::SUBSCRIBERS, move |_| {
            let mut registry = ListenerRegistry::with_container(Arc::clone(&delegate));
            for source in &sources.subscribers {
                let subscriber = match source {
                    ListenerSource::Subscriber(subscriber) => Arc::clone(subscriber),
                    ListenerSource::SubscriberService(id) => resolve_subscriber(&*delegate, id)?,
                    _ => continue,
                };
                registry.subscribe(subscriber)?;
            }
            Ok(registry)
        })?;

        let sources = Arc::clone(&self.sources);
        builder
            .register(ids::AGGREGATE, move |_| {
                Ok(ListenerProviderAggregate::new(
                    sources.providers.iter().cloned(),
                ))
            })?
            .extend(
                ids::AGGREGATE,
                |container, aggregate: &mut ListenerProviderAggregate| {
                    for id in [ids::PRIORITIZED, ids::CALLABLES, ids::SUBSCRIBERS] {
                        let registry: Arc<dyn ListenerProvider> =
                            container.get_as::<ListenerRegistry>(id)?;
                        aggregate.attach(registry);
                    }
                    Ok(())
                },
            )?
            .alias(ids::LISTENER_PROVIDER, ids::AGGREGATE)?;

        builder.register(ids::EVENT_DISPATCHER, |container| {
            let provider: Arc<dyn ListenerProvider> =
                container.get_as::<ListenerProviderAggregate>(ids::LISTENER_PROVIDER)?;
            Ok(EventDispatcher::new(provider))
        })?;

        Ok(())
    }
}

fn resolve_subscriber(
    delegate: &dyn Container,
    id: &str,
) -> EventResult<Arc<dyn EventSubscriber>> {
    let service = delegate.get(id)?;
    service
        .downcast_ref::<Arc<dyn EventSubscriber>>()
        .cloned()
        .ok_or_else(|| {
            EventError::InvalidInput(format!(
                "Service \"{id}\" is not an event subscriber"
            ))
        })
}

/// Container exposing the dispatcher and its listener providers.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use herald_container::{Container, ServiceContainer};
/// use herald_events::{Event, EventDispatcherContainer, ListenerSource};
///
/// #[derive(Debug, Default)]
/// struct Counted(u32);
/// impl Event for Counted {}
///
/// let delegate: Arc<dyn Container> = Arc::new(ServiceContainer::builder().build());
/// let container = EventDispatcherContainer::new(
///     vec![ListenerSource::typed(|event: &mut Counted| {
///         event.0 += 1;
///         Ok(())
///     })],
///     delegate,
/// )?;
///
/// let event = container.dispatcher().dispatch(Counted::default())?;
/// assert_eq!(event.0, 1);
/// # Ok::<(), herald_events::EventError>(())
/// ```
pub struct EventDispatcherContainer {
    services: ServiceContainer,
    delegate: Arc<dyn Container>,
    dispatcher: Arc<EventDispatcher>,
}

impl EventDispatcherContainer {
    /// Build the dispatcher services from `sources`.
    ///
    /// When `sources` is empty and the delegate provides
    /// [`ids::CONFIG_LISTENERS`], those sources are used instead.
    ///
    /// # Errors
    ///
    /// Registration failures are reported as the underlying error:
    /// [`EventError::InvalidInput`] for malformed subscribers,
    /// [`EventError::Unsupported`] for lazy listeners the delegate cannot provide and
    /// [`ContainerError::NotFound`] for missing subscriber services.
    pub fn new(sources: Vec<ListenerSource>, delegate: Arc<dyn Container>) -> EventResult<Self> {
        let sources = if sources.is_empty() && delegate.has(ids::CONFIG_LISTENERS) {
            debug!("Using listener sources from the delegate container");
            let configured = delegate.get_as::<Vec<ListenerSource>>(ids::CONFIG_LISTENERS)?;
            configured.iter().cloned().collect()
        } else {
            sources
        };
        let source_count = sources.len();

        let mut builder = ServiceContainer::builder();
        builder.provider(&EventDispatcherServiceProvider::new(
            sources,
            Arc::clone(&delegate),
        ))?;
        let services = builder.build();

        let dispatcher = services
            .get_as::<EventDispatcher>(ids::EVENT_DISPATCHER)
            .map_err(surface)?;

        info!(sources = source_count, "Event dispatcher ready");
        Ok(Self {
            services,
            delegate,
            dispatcher,
        })
    }

    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// The aggregate listener provider
    pub fn listener_provider(&self) -> EventResult<Arc<ListenerProviderAggregate>> {
        self.services
            .get_as::<ListenerProviderAggregate>(ids::LISTENER_PROVIDER)
            .map_err(surface)
    }

    /// Container used to resolve lazy listeners and subscriber services
    pub fn delegate(&self) -> &Arc<dyn Container> {
        &self.delegate
    }
}

impl Container for EventDispatcherContainer {
    fn has(&self, id: &str) -> bool {
        self.services.has(id)
    }

    fn get(&self, id: &str) -> ContainerResult<Service> {
        self.services.get(id)
    }
}

impl fmt::Debug for EventDispatcherContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcherContainer")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

/// Unwrap construction failures down to the error that caused them
fn surface(error: ContainerError) -> EventError {
    let mut error = error;
    loop {
        let ContainerError::InvalidService { id, source } = error else {
            return EventError::Container(error);
        };
        let source = match source.downcast::<EventError>() {
            Ok(EventError::Container(inner)) => {
                error = inner;
                continue;
            }
            Ok(event_error) => return event_error,
            Err(source) => source,
        };
        match source.downcast::<ContainerError>() {
            Ok(inner) => error = inner,
            Err(source) => {
                return EventError::Container(ContainerError::InvalidService { id, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKey};
    use crate::listener::{EventHandler, Listener, ListenerResult};
    use crate::registry::SubscriptionTable;

    #[derive(Debug, Default)]
    struct Trail(Vec<&'static str>);

    impl Event for Trail {}

    fn empty_delegate() -> Arc<dyn Container> {
        Arc::new(ServiceContainer::builder().build())
    }

    fn mark(name: &'static str) -> Listener {
        Listener::typed(move |event: &mut Trail| {
            event.0.push(name);
            Ok(())
        })
    }

    struct Broken;

    impl EventHandler for Broken {
        fn handle(&self, _method: &str, _event: &mut dyn Event) -> ListenerResult {
            Ok(())
        }
    }

    impl EventSubscriber for Broken {
        fn subscribed_events(&self) -> SubscriptionTable {
            SubscriptionTable::new().on("x", "")
        }
    }

    #[test]
    fn test_registry_attach_order() {
        let key = EventKey::of::<Trail>();
        let mut user = ListenerRegistry::new();
        user.listen(&key, mark("provider"), -100);

        let sources = vec![
            ListenerSource::callable_with_priority(&key, mark("callable"), 100),
            ListenerSource::from(crate::ListenerDescriptor::callable(&key, mark("descriptor"), 0)),
            ListenerSource::provider(Arc::new(user)),
        ];
        let container = EventDispatcherContainer::new(sources, empty_delegate()).unwrap();

        let event = container.dispatcher().dispatch(Trail::default()).unwrap();
        assert_eq!(event.0, ["provider", "descriptor", "callable"]);
    }

    #[test]
    fn test_services_are_registered() {
        let container = EventDispatcherContainer::new(Vec::new(), empty_delegate()).unwrap();
        for id in [
            ids::PRIORITIZED,
            ids::CALLABLES,
            ids::SUBSCRIBERS,
            ids::AGGREGATE,
            ids::LISTENER_PROVIDER,
            ids::EVENT_DISPATCHER,
        ] {
            assert!(container.has(id), "missing {id}");
        }
        assert!(!container.has(ids::CONFIG_LISTENERS));

        let aggregate = container.listener_provider().unwrap();
        assert_eq!(aggregate.len(), 3);
        let direct = container
            .get_as::<ListenerProviderAggregate>(ids::AGGREGATE)
            .unwrap();
        assert!(Arc::ptr_eq(&aggregate, &direct));
    }

    #[test]
    fn test_invalid_subscriber_surfaces_invalid_input() {
        let result = EventDispatcherContainer::new(
            vec![ListenerSource::subscriber(Arc::new(Broken))],
            empty_delegate(),
        );
        assert!(matches!(result, Err(EventError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_lazy_service_surfaces_unsupported() {
        let result = EventDispatcherContainer::new(
            vec![ListenerSource::service("x", "missing.handler")],
            empty_delegate(),
        );
        assert!(matches!(result, Err(EventError::Unsupported(_))));
    }

    #[test]
    fn test_missing_subscriber_service_surfaces_not_found() {
        let result = EventDispatcherContainer::new(
            vec![ListenerSource::SubscriberService("missing".into())],
            empty_delegate(),
        );
        assert!(matches!(
            result,
            Err(EventError::Container(ContainerError::NotFound { ref id })) if id == "missing"
        ));
    }

    #[test]
    fn test_surface_keeps_foreign_failures() {
        let error = ContainerError::InvalidService {
            id: "svc".into(),
            source: anyhow::anyhow!("disk full"),
        };
        assert!(matches!(
            surface(error),
            EventError::Container(ContainerError::InvalidService { ref id, .. }) if id == "svc"
        ));
    }
}
