//! End-to-end tests: listener configuration, the service container and dispatch
//!
//! These tests wire the dispatcher the way an application does: handlers live in a
//! delegate container, listeners come from code or from a YAML file, and the
//! dispatcher is obtained from an [`EventDispatcherContainer`].

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use herald_container::{Container, ContainerExt, ServiceContainer, ServiceContainerBuilder};
use herald_events::{
    ids, ConfigLoader, Event, EventDispatcher, EventDispatcherContainer, EventError,
    EventHandler, EventSubscriber, ListenerResult, ListenerSource, Propagation,
    StoppableEvent, SubscriptionTable,
};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Default)]
struct OrderPlaced {
    order_id: u32,
    log: Vec<String>,
    propagation: Propagation,
}

impl Event for OrderPlaced {
    fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
        Some(&self.propagation)
    }
}

/// Handler that logs `service.method` and stops on `halt`
struct Recorder {
    service: &'static str,
}

impl EventHandler for Recorder {
    fn name(&self) -> &str {
        self.service
    }

    fn handle(&self, method: &str, event: &mut dyn Event) -> ListenerResult {
        let order = event
            .downcast_mut::<OrderPlaced>()
            .ok_or_else(|| anyhow::anyhow!("{} only handles orders", self.service))?;
        order.log.push(format!("{}.{}", self.service, method));
        match method {
            "halt" => order.propagation.stop(),
            "reject" => anyhow::bail!("order {} rejected", order.order_id),
            _ => {}
        }
        Ok(())
    }
}

/// Subscriber declaring its own routes
struct Inventory;

impl EventHandler for Inventory {
    fn name(&self) -> &str {
        "inventory"
    }

    fn handle(&self, method: &str, event: &mut dyn Event) -> ListenerResult {
        Recorder {
            service: "inventory",
        }
        .handle(method, event)
    }
}

impl EventSubscriber for Inventory {
    fn subscribed_events(&self) -> SubscriptionTable {
        SubscriptionTable::new().on("order.placed", [("reserve", 20), ("release", -20)])
    }
}

fn handler(builder: &mut ServiceContainerBuilder, service: &'static str, builds: &Arc<AtomicUsize>) {
    let builds = Arc::clone(builds);
    builder
        .register(service, move |_| {
            builds.fetch_add(1, Ordering::SeqCst);
            let handler: Arc<dyn EventHandler> = Arc::new(Recorder { service });
            Ok(handler)
        })
        .unwrap();
}

fn delegate(builds: &Arc<AtomicUsize>) -> ServiceContainerBuilder {
    let mut builder = ServiceContainer::builder();
    handler(&mut builder, "mailer", builds);
    handler(&mut builder, "audit", builds);
    handler(&mut builder, "billing", builds);
    builder
        .register("inventory", |_| {
            let subscriber: Arc<dyn EventSubscriber> = Arc::new(Inventory);
            Ok(subscriber)
        })
        .unwrap();
    builder
}

fn dispatch(dispatcher: &EventDispatcher) -> Vec<String> {
    dispatcher
        .dispatch_named(
            OrderPlaced {
                order_id: 1,
                ..OrderPlaced::default()
            },
            "order.placed",
        )
        .unwrap()
        .log
}

#[test]
fn test_yaml_configuration_end_to_end() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listeners.yaml");
    fs::write(
        &path,
        r#"
listeners:
  - event: order.placed
    service: mailer
    method: send_receipt
    priority: 10
  - event: order.placed
    service: audit
subscribers:
  - service: inventory
  - service: billing
    events:
      order.placed: [[charge, 5], [notify]]
"#,
    )
    .unwrap();

    let builds = Arc::new(AtomicUsize::new(0));
    let sources = ConfigLoader::load_from_path(&path)
        .unwrap()
        .into_sources()
        .unwrap();
    let container =
        EventDispatcherContainer::new(sources, Arc::new(delegate(&builds).build())).unwrap();

    // Lazy handlers are not built until the first dispatch
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    let dispatcher = container.dispatcher();
    let expected = [
        "mailer.send_receipt",
        "billing.charge",
        "audit.invoke",
        "billing.notify",
        "inventory.reserve",
        "inventory.release",
    ];
    assert_eq!(dispatch(&dispatcher), expected);
    assert_eq!(dispatch(&dispatcher), expected);
    assert_eq!(builds.load(Ordering::SeqCst), 3);
}

#[test]
fn test_missing_configuration_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_from_path(&dir.path().join("absent.yaml")).unwrap();
    assert!(config.is_empty());
    assert!(config.into_sources().unwrap().is_empty());
}

#[test]
fn test_configured_sources_from_delegate() {
    init_tracing();
    let builds = Arc::new(AtomicUsize::new(0));
    let mut builder = delegate(&builds);
    builder
        .register(ids::CONFIG_LISTENERS, |_| {
            Ok(vec![
                ListenerSource::service_method("order.placed", "audit", "halt", 0),
                ListenerSource::service_method("order.placed", "mailer", "send_receipt", -5),
            ])
        })
        .unwrap();

    let container = EventDispatcherContainer::new(Vec::new(), Arc::new(builder.build())).unwrap();

    // The mailer never runs because audit stops propagation
    assert_eq!(dispatch(&container.dispatcher()), ["audit.halt"]);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_sources_win_over_configured() {
    let builds = Arc::new(AtomicUsize::new(0));
    let mut builder = delegate(&builds);
    builder
        .register(ids::CONFIG_LISTENERS, |_| {
            Ok(vec![ListenerSource::service("order.placed", "audit")])
        })
        .unwrap();

    let container = EventDispatcherContainer::new(
        vec![ListenerSource::SubscriberService("inventory".to_string())],
        Arc::new(builder.build()),
    )
    .unwrap();

    assert_eq!(
        dispatch(&container.dispatcher()),
        ["inventory.reserve", "inventory.release"]
    );
}

#[test]
fn test_listener_fault_through_container() {
    init_tracing();
    let builds = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);

    let container = EventDispatcherContainer::new(
        vec![
            ListenerSource::service_method("order.placed", "billing", "reject", 0),
            ListenerSource::typed(move |fault: &mut herald_events::FaultEvent| {
                record
                    .lock()
                    .unwrap()
                    .push(fault.listener().name().to_string());
                Ok(())
            }),
        ],
        Arc::new(delegate(&builds).build()),
    )
    .unwrap();

    let error = container
        .dispatcher()
        .dispatch_named(
            OrderPlaced {
                order_id: 9,
                ..OrderPlaced::default()
            },
            "order.placed",
        )
        .unwrap_err();

    assert!(matches!(error, EventError::ListenerFault { ref listener, .. } if listener == "billing::reject"));
    assert_eq!(error.cause().unwrap().to_string(), "order 9 rejected");
    assert_eq!(*seen.lock().unwrap(), ["billing::reject"]);
}

#[test]
fn test_dispatcher_is_a_container_service() {
    let builds = Arc::new(AtomicUsize::new(0));
    let container =
        EventDispatcherContainer::new(Vec::new(), Arc::new(delegate(&builds).build())).unwrap();

    let resolved = container
        .get_as::<EventDispatcher>(ids::EVENT_DISPATCHER)
        .unwrap();
    assert!(Arc::ptr_eq(&resolved, &container.dispatcher()));
    assert!(container.delegate().has("mailer"));
    assert!(!container.has("mailer"));
}

#[test]
fn test_unknown_configured_service_fails_construction() {
    let config = ConfigLoader::parse(
        r#"
listeners:
  - event: order.placed
    service: missing
"#,
    )
    .unwrap();

    let builds = Arc::new(AtomicUsize::new(0));
    let result = EventDispatcherContainer::new(
        config.into_sources().unwrap(),
        Arc::new(delegate(&builds).build()),
    );
    assert!(matches!(result, Err(EventError::Unsupported(_))));
}
