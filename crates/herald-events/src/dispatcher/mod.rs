//! Event dispatching
//!
//! The dispatcher resolves the listeners for an event, runs each of them once and
//! returns the event. A dispatch moves through these states:
//!
//! 1. **Resolving**: an already stopped event is returned untouched. Otherwise the
//!    listeners for the event's type and for its dispatch name are looked up and
//!    chained, typed lookup first, dropping listeners already seen.
//! 2. **Invoking**: each listener receives the original event.
//! 3. **Stopped**: a listener stopped propagation; later listeners do not run.
//! 4. **Completed**: every listener ran.
//! 5. **Faulted**: a listener returned an error. A [`FaultEvent`](crate::FaultEvent)
//!    describing the failure is dispatched once, then the original error is returned
//!    as [`EventError::ListenerFault`](crate::EventError::ListenerFault). Errors raised
//!    by fault listeners are logged and dropped.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use herald_events::{Event, EventDispatcher, Listener, ListenerRegistry};
//!
//! #[derive(Debug, Default)]
//! struct Greeted {
//!     greetings: Vec<String>,
//! }
//!
//! impl Event for Greeted {}
//!
//! let mut registry = ListenerRegistry::new();
//! registry.listen(
//!     "greet",
//!     Listener::typed(|event: &mut Greeted| {
//!         event.greetings.push("hello".to_string());
//!         Ok(())
//!     }),
//!     0,
//! );
//!
//! let dispatcher = EventDispatcher::new(Arc::new(registry));
//! let event = dispatcher.dispatch_named(Greeted::default(), "greet")?;
//! assert_eq!(event.greetings, ["hello"]);
//! # Ok::<(), herald_events::EventError>(())
//! ```

pub mod event;

pub use event::EventDispatcher;

use crate::error::EventResult;
use crate::event::Event;

/// Object-safe dispatching for type-erased events
///
/// Lets components hold an `Arc<dyn Dispatch>` without naming the dispatcher type.
pub trait Dispatch: Send + Sync {
    /// Dispatch `event`, optionally under an explicit name
    fn dispatch_event(
        &self,
        event: Box<dyn Event>,
        name: Option<&str>,
    ) -> EventResult<Box<dyn Event>>;
}
