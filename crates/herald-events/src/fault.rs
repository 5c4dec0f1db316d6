//! Fault reports for failing listeners

use std::fmt;

use crate::error::EventError;
use crate::event::{Event, EventKey};
use crate::listener::Listener;

/// Dispatched when a listener fails.
///
/// Carries the event that was being dispatched, the key it was dispatched under, the
/// listener that failed and the error it raised. Listeners registered for
/// `FaultEvent` can log or compensate; the original error is still returned to the
/// caller of the failed dispatch.
pub struct FaultEvent {
    event: Box<dyn Event>,
    event_key: EventKey,
    listener: Listener,
    cause: anyhow::Error,
}

impl FaultEvent {
    pub fn new(
        event: Box<dyn Event>,
        event_key: EventKey,
        listener: Listener,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            event,
            event_key,
            listener,
            cause,
        }
    }

    /// The event whose dispatch failed
    pub fn event(&self) -> &dyn Event {
        &*self.event
    }

    /// The failed event, if it is an `E`
    pub fn event_as<E: Event>(&self) -> Option<&E> {
        self.event().downcast_ref::<E>()
    }

    /// Key the failed event was dispatched under
    pub fn event_key(&self) -> &EventKey {
        &self.event_key
    }

    /// The listener that failed
    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// The error the listener raised
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Convert into the error reported to the caller of the failed dispatch
    pub fn into_error(self) -> EventError {
        EventError::ListenerFault {
            event: self.event_key,
            listener: self.listener.name().to_string(),
            source: self.cause,
        }
    }
}

impl Event for FaultEvent {}

impl fmt::Debug for FaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultEvent")
            .field("event", &self.event.type_name())
            .field("event_key", &self.event_key)
            .field("listener", &self.listener.name())
            .field("cause", &self.cause)
            .finish()
    }
}
