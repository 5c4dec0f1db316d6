//! Declarative listener configuration
//!
//! Listener configuration is stored in YAML. Every entry names a service in the
//! delegate container; handlers are resolved lazily on first dispatch.
//!
//! ```yaml
//! listeners:
//!   - event: order.placed
//!     service: mailer
//!     method: send_receipt
//!     priority: 10
//!   - event: order.placed
//!     service: audit
//! subscribers:
//!   - service: inventory
//!   - service: billing
//!     events:
//!       order.placed: [charge, 5]
//!       order.cancelled: [[refund, 10], [notify]]
//! ```
//!
//! A subscriber entry without `events` must resolve to an `Arc<dyn EventSubscriber>`
//! and declares its own routes. With `events`, the routes come from the file and the
//! service only needs to be an event handler.

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

use crate::error::{EventError, EventResult};
use crate::listener::DEFAULT_METHOD;
use crate::registry::SubscriptionTable;
use crate::source::ListenerSource;

/// Listener configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub listeners: Vec<ListenerEntry>,
    #[serde(default)]
    pub subscribers: Vec<SubscriberEntry>,
}

/// One lazy listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerEntry {
    pub event: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

/// One subscriber, with an optional inline route table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberEntry {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<serde_json::Value>,
}

impl ListenerConfig {
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.subscribers.is_empty()
    }

    /// Convert into registration sources, validating every entry first
    pub fn into_sources(self) -> EventResult<Vec<ListenerSource>> {
        let mut sources = Vec::with_capacity(self.listeners.len() + self.subscribers.len());

        for (index, entry) in self.listeners.into_iter().enumerate() {
            require("event", &entry.event, "listeners", index)?;
            require("service", &entry.service, "listeners", index)?;
            let method = entry.method.unwrap_or_else(|| DEFAULT_METHOD.to_string());
            require("method", &method, "listeners", index)?;

            sources.push(ListenerSource::service_method(
                entry.event,
                entry.service,
                method,
                entry.priority,
            ));
        }

        for (index, entry) in self.subscribers.into_iter().enumerate() {
            require("service", &entry.service, "subscribers", index)?;

            let Some(events) = entry.events else {
                sources.push(ListenerSource::SubscriberService(entry.service));
                continue;
            };

            let routes = SubscriptionTable::from_value(events)
                .and_then(|table| table.normalize())
                .map_err(|error| match error {
                    EventError::InvalidInput(reason) => EventError::InvalidInput(format!(
                        "subscribers[{index}] ({}): {reason}",
                        entry.service
                    )),
                    other => other,
                })?;

            sources.extend(routes.into_iter().map(|(event, method, priority)| {
                ListenerSource::service_method(event, entry.service.as_str(), method, priority)
            }));
        }

        Ok(sources)
    }
}

fn require(field: &str, value: &str, section: &str, index: usize) -> EventResult<()> {
    if value.trim().is_empty() {
        return Err(EventError::InvalidInput(format!(
            "{section}[{index}]: \"{field}\" must not be empty"
        )));
    }
    Ok(())
}
