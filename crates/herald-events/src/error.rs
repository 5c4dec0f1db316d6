//! Error types for event dispatching
//!
//! Registration problems (`InvalidInput`, `Unsupported`, container lookups) surface
//! immediately to whoever builds the listener graph. Listener failures surface from
//! [`EventDispatcher::dispatch`](crate::EventDispatcher::dispatch) as
//! [`EventError::ListenerFault`], after fault listeners had their chance to react.
//!
//! # Examples
//!
//! Recovering the error a listener raised:
//!
//! ```ignore
//! match dispatcher.dispatch(OrderPlaced::new(42)) {
//!     Ok(event) => println!("handled {:?}", event),
//!     Err(error) => match error.cause() {
//!         Some(cause) => eprintln!("listener failed: {cause}"),
//!         None => eprintln!("dispatch failed: {error}"),
//!     },
//! }
//! ```

use herald_container::ContainerError;
use thiserror::Error;

use crate::event::EventKey;

/// Errors that can occur while registering listeners or dispatching events
#[derive(Debug, Error)]
pub enum EventError {
    /// A registration source or route table is malformed
    ///
    /// Common causes:
    /// - An empty method name or event name
    /// - A method spec that is neither a name, a `(name, priority)` pair nor a list of pairs
    /// - A subscriber service that does not resolve to a subscriber
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A listener cannot be supported by this dispatcher
    ///
    /// Raised for lazy listeners whose service identifier the delegate container
    /// does not know, and for services that are not event handlers.
    #[error("Unsupported listener: {0}")]
    Unsupported(String),

    /// A listener failed while handling an event
    ///
    /// `source` is the error the listener raised. It is reported only after the
    /// [`FaultEvent`](crate::FaultEvent) for this failure has been dispatched.
    #[error("Listener \"{listener}\" failed while handling \"{event}\"")]
    ListenerFault {
        event: EventKey,
        listener: String,
        #[source]
        source: anyhow::Error,
    },

    /// A typed listener received an event of another type
    #[error("Listener \"{listener}\" expects {expected}, got {actual}")]
    EventTypeMismatch {
        listener: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Service container error
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Invalid listener configuration
    #[error("Invalid listener configuration: {0}")]
    Configuration(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EventError {
    /// The error a listener raised, if this is a listener fault
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            EventError::ListenerFault { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Consumes the error, returning the listener's cause if this is a listener fault
    pub fn into_cause(self) -> Option<anyhow::Error> {
        match self {
            EventError::ListenerFault { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_listener_fault(&self) -> bool {
        matches!(self, EventError::ListenerFault { .. })
    }
}

/// Result type for event operations
pub type EventResult<T> = std::result::Result<T, EventError>;
