//! Herald event dispatching
//!
//! Routes application events to ordered sets of listeners collected from several
//! registration sources.
//!
//! # Overview
//!
//! - [`ListenerRegistry`] stores listeners per [`EventKey`] in priority order and
//!   normalizes subscriber route tables.
//! - [`ListenerProviderAggregate`] chains providers in attach order.
//! - [`EventDispatcher`] runs each resolved listener once, honours stop requests and
//!   reports listener failures through [`FaultEvent`] before returning them.
//! - [`EventDispatcherContainer`] wires everything from a list of
//!   [`ListenerSource`]s, resolving lazy listeners from a delegate container.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use herald_events::{Event, EventDispatcher, Listener, ListenerRegistry, Propagation, StoppableEvent};
//!
//! #[derive(Debug, Default)]
//! struct OrderPlaced {
//!     handled_by: Vec<&'static str>,
//!     propagation: Propagation,
//! }
//!
//! impl Event for OrderPlaced {
//!     fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
//!         Some(&self.propagation)
//!     }
//! }
//!
//! let mut registry = ListenerRegistry::new();
//! registry
//!     .listen(
//!         herald_events::EventKey::of::<OrderPlaced>(),
//!         Listener::typed(|event: &mut OrderPlaced| {
//!             event.handled_by.push("fraud-check");
//!             event.propagation.stop();
//!             Ok(())
//!         }),
//!         100,
//!     )
//!     .listen(
//!         herald_events::EventKey::of::<OrderPlaced>(),
//!         Listener::typed(|event: &mut OrderPlaced| {
//!             event.handled_by.push("mailer");
//!             Ok(())
//!         }),
//!         0,
//!     );
//!
//! let dispatcher = EventDispatcher::new(Arc::new(registry));
//! let event = dispatcher.dispatch(OrderPlaced::default())?;
//! assert_eq!(event.handled_by, ["fraud-check"]);
//! # Ok::<(), herald_events::EventError>(())
//! ```
//!
//! # Configuration
//!
//! Lazy listeners can be declared in YAML and loaded with [`ConfigLoader`]; see the
//! [`config`] module.

pub mod config;
pub mod di;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fault;
pub mod listener;
pub mod provider;
pub mod registry;
pub mod source;

pub use config::{ConfigLoader, ListenerConfig, ListenerEntry, SubscriberEntry};
pub use di::{ids, EventDispatcherContainer, EventDispatcherServiceProvider};
pub use dispatcher::{Dispatch, EventDispatcher};
pub use error::{EventError, EventResult};
pub use event::{AsAny, Event, EventKey, NamedEvent, Propagation, StoppableEvent};
pub use fault::FaultEvent;
pub use listener::{
    EventHandler, LazyListener, Listener, ListenerId, ListenerResult, DEFAULT_METHOD,
};
pub use provider::ListenerProviderAggregate;
pub use registry::{
    EventSubscriber, ListenerDescriptor, ListenerOrigin, ListenerProvider, ListenerRegistry,
    ListenerTarget, Listeners, MethodSpec, PriorityBucket, SubscriptionTable,
};
pub use source::{ListenerSource, SourceKind};
