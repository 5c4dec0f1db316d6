//! Dispatch loop and fault recovery

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{EventError, EventResult};
use crate::event::{AsAny, Event, EventKey, NamedEvent};
use crate::fault::FaultEvent;
use crate::listener::Listener;
use crate::registry::{ListenerProvider, Listeners};

/// Dispatches events to the listeners of a [`ListenerProvider`]
#[derive(Clone)]
pub struct EventDispatcher {
    provider: Arc<dyn ListenerProvider>,
}

/// A listener failure, before it is reported
struct Fault {
    key: EventKey,
    listener: Listener,
    cause: anyhow::Error,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    /// The event was stopped before dispatch
    Skipped,
    Stopped,
    Completed,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    ///
    /// * `provider` - Source of listeners, usually a
    ///   [`ListenerProviderAggregate`](crate::ListenerProviderAggregate)
    pub fn new(provider: Arc<dyn ListenerProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn ListenerProvider> {
        &self.provider
    }

    /// Dispatch `event` under its type and return it.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::ListenerFault`] carrying the listener's error if a
    /// listener fails.
    pub fn dispatch<E: Event>(&self, event: E) -> EventResult<E> {
        self.dispatch_as(event, None)
    }

    /// Dispatch `event` under `name` as well as under its type
    pub fn dispatch_named<E: Event>(&self, event: E, name: &str) -> EventResult<E> {
        self.dispatch_as(event, Some(name))
    }

    /// Dispatch a type-erased event
    pub fn dispatch_boxed(
        &self,
        mut event: Box<dyn Event>,
        name: Option<&str>,
    ) -> EventResult<Box<dyn Event>> {
        match self.run(&mut *event, name) {
            Ok(_) => Ok(event),
            Err(fault) => Err(self.fail(event, fault)),
        }
    }

    fn dispatch_as<E: Event>(&self, mut event: E, name: Option<&str>) -> EventResult<E> {
        match self.run(&mut event, name) {
            Ok(_) => Ok(event),
            Err(fault) => Err(self.fail(Box::new(event), fault)),
        }
    }

    fn run(&self, event: &mut dyn Event, name: Option<&str>) -> Result<Outcome, Fault> {
        let named = NamedEvent::new(event, name);
        let key = named.key().clone();

        if event.is_propagation_stopped() {
            debug!(event_key = %key, "Event already stopped, skipping dispatch");
            return Ok(Outcome::Skipped);
        }

        debug!(
            event_key = %key,
            event_type = event.type_name(),
            "Dispatching event"
        );

        // Without a distinct name both lookups ask for the same key
        let listeners = self.provider.listeners_for_event(event);
        let listeners: Listeners<'_> = if key == EventKey::of_event(event) {
            listeners
        } else {
            Box::new(listeners.chain(self.provider.listeners_for_named(&named)))
        };

        let mut seen = HashSet::new();
        // Invoked listeners stay alive until dispatch ends so no identity is reused
        let mut invoked: Vec<Listener> = Vec::new();
        let mut outcome = Outcome::Completed;

        for listener in listeners {
            if !seen.insert(listener.id().clone()) {
                continue;
            }

            debug!(event_key = %key, listener = listener.name(), "Invoking listener");
            if let Err(cause) = listener.call(event) {
                return Err(Fault {
                    key,
                    listener,
                    cause,
                });
            }
            invoked.push(listener);

            if event.is_propagation_stopped() {
                outcome = Outcome::Stopped;
                break;
            }
        }

        debug!(
            event_key = %key,
            outcome = ?outcome,
            invoked = invoked.len(),
            "Dispatch finished"
        );
        Ok(outcome)
    }

    /// Report a listener failure and produce the error for the caller.
    ///
    /// Fault listeners see a [`FaultEvent`] once. A failure while dispatching a
    /// `FaultEvent` is not reported again; the fault it carries is returned instead.
    fn fail(&self, event: Box<dyn Event>, fault: Fault) -> EventError {
        let Fault {
            key,
            listener,
            cause,
        } = fault;

        if event.is::<FaultEvent>() {
            warn!(
                listener = listener.name(),
                error = %cause,
                "Fault listener failed, keeping the original fault"
            );
            return match AsAny::into_any(event).downcast::<FaultEvent>() {
                Ok(original) => (*original).into_error(),
                Err(_) => EventError::ListenerFault {
                    event: key,
                    listener: listener.name().to_string(),
                    source: cause,
                },
            };
        }

        warn!(
            event_key = %key,
            listener = listener.name(),
            error = %cause,
            "Listener failed"
        );

        let mut report = FaultEvent::new(event, key, listener, cause);
        if let Err(secondary) = self.run(&mut report, None) {
            warn!(
                event_key = %secondary.key,
                listener = secondary.listener.name(),
                error = %secondary.cause,
                "Fault listener failed, keeping the original fault"
            );
        }
        report.into_error()
    }
}

impl super::Dispatch for EventDispatcher {
    fn dispatch_event(
        &self,
        event: Box<dyn Event>,
        name: Option<&str>,
    ) -> EventResult<Box<dyn Event>> {
        self.dispatch_boxed(event, name)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher").finish_non_exhaustive()
    }
}
