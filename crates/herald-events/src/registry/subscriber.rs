//! Subscribers and their route tables
//!
//! A subscriber declares which of its methods handle which events. Each route maps an
//! event key to a [`MethodSpec`] in one of three shapes:
//!
//! - a bare method name, at priority 0;
//! - a `(method, priority)` pair;
//! - an ordered list of `(method, priority)` pairs.
//!
//! The same shapes are accepted from declarative data with
//! [`SubscriptionTable::from_value`]:
//!
//! ```rust
//! use herald_events::{MethodSpec, SubscriptionTable};
//! use serde_json::json;
//!
//! let table = SubscriptionTable::from_value(json!({
//!     "user.created": "onCreated",
//!     "user.deleted": ["onDeleted", 10],
//!     "user.updated": [["audit", 50], ["onUpdated"]],
//! }))?;
//!
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.normalize()?.len(), 4);
//! # Ok::<(), herald_events::EventError>(())
//! ```

use serde_json::Value;

use crate::error::{EventError, EventResult};
use crate::event::EventKey;
use crate::listener::EventHandler;

/// A handler that declares its own routes
pub trait EventSubscriber: EventHandler {
    /// Routes from event keys to handler methods
    fn subscribed_events(&self) -> SubscriptionTable;
}

/// Method declaration for one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSpec {
    /// Method name at priority 0
    Method(String),
    /// Method name and priority
    WithPriority(String, i32),
    /// Several methods for the same event, in declaration order
    List(Vec<(String, i32)>),
}

impl MethodSpec {
    /// Parse one of the three shapes from a JSON value
    pub fn from_value(value: &Value) -> EventResult<Self> {
        match value {
            Value::String(method) => Ok(MethodSpec::Method(method.clone())),
            Value::Array(items) => match items.first() {
                Some(Value::String(_)) => {
                    let (method, priority) = parse_pair(items)?;
                    Ok(MethodSpec::WithPriority(method, priority))
                }
                Some(Value::Array(_)) => items
                    .iter()
                    .map(|item| match item {
                        Value::Array(pair) => parse_pair(pair),
                        other => Err(invalid(format!(
                            "expected a [method, priority] pair, got {other}"
                        ))),
                    })
                    .collect::<EventResult<Vec<_>>>()
                    .map(MethodSpec::List),
                Some(other) => Err(invalid(format!("unrecognized method spec {other}"))),
                None => Err(invalid("empty method spec")),
            },
            other => Err(invalid(format!("unrecognized method spec {other}"))),
        }
    }

    /// Normalized `(method, priority)` entries, in declaration order
    pub fn entries(&self) -> EventResult<Vec<(&str, i32)>> {
        let entries = match self {
            MethodSpec::Method(method) => vec![(method.as_str(), 0)],
            MethodSpec::WithPriority(method, priority) => vec![(method.as_str(), *priority)],
            MethodSpec::List(pairs) => pairs
                .iter()
                .map(|(method, priority)| (method.as_str(), *priority))
                .collect(),
        };

        if entries.is_empty() {
            return Err(invalid("empty method list"));
        }
        if entries.iter().any(|(method, _)| method.trim().is_empty()) {
            return Err(invalid("empty method name"));
        }
        Ok(entries)
    }
}

fn parse_pair(items: &[Value]) -> EventResult<(String, i32)> {
    match items {
        [Value::String(method)] => Ok((method.clone(), 0)),
        [Value::String(method), priority] => Ok((method.clone(), parse_priority(priority)?)),
        _ => Err(invalid(format!(
            "expected [method] or [method, priority], got {}",
            Value::Array(items.to_vec())
        ))),
    }
}

fn parse_priority(value: &Value) -> EventResult<i32> {
    value
        .as_i64()
        .and_then(|priority| i32::try_from(priority).ok())
        .ok_or_else(|| invalid(format!("priority must be a 32-bit integer, got {value}")))
}

fn invalid(reason: impl Into<String>) -> EventError {
    EventError::InvalidInput(reason.into())
}

impl From<&str> for MethodSpec {
    fn from(method: &str) -> Self {
        MethodSpec::Method(method.to_string())
    }
}

impl From<String> for MethodSpec {
    fn from(method: String) -> Self {
        MethodSpec::Method(method)
    }
}

impl From<(&str, i32)> for MethodSpec {
    fn from((method, priority): (&str, i32)) -> Self {
        MethodSpec::WithPriority(method.to_string(), priority)
    }
}

impl From<Vec<(&str, i32)>> for MethodSpec {
    fn from(pairs: Vec<(&str, i32)>) -> Self {
        MethodSpec::List(
            pairs
                .into_iter()
                .map(|(method, priority)| (method.to_string(), priority))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, i32); N]> for MethodSpec {
    fn from(pairs: [(&str, i32); N]) -> Self {
        MethodSpec::from(pairs.to_vec())
    }
}

/// Ordered routes of a subscriber
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionTable {
    routes: Vec<(EventKey, MethodSpec)>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route
    pub fn on(mut self, event: impl Into<EventKey>, spec: impl Into<MethodSpec>) -> Self {
        self.push(event, spec);
        self
    }

    pub fn push(&mut self, event: impl Into<EventKey>, spec: impl Into<MethodSpec>) {
        self.routes.push((event.into(), spec.into()));
    }

    /// Parse a table from a JSON object mapping event keys to method specs
    pub fn from_value(value: Value) -> EventResult<Self> {
        let Value::Object(routes) = value else {
            return Err(invalid(format!(
                "a route table must map event names to method specs, got {value}"
            )));
        };

        routes
            .iter()
            .map(|(event, spec)| {
                MethodSpec::from_value(spec)
                    .map(|spec| (EventKey::new(event.as_str()), spec))
                    .map_err(|error| prefix(event, error))
            })
            .collect::<EventResult<Vec<_>>>()
            .map(|routes| Self { routes })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &MethodSpec)> + '_ {
        self.routes.iter().map(|(event, spec)| (event, spec))
    }

    /// Number of routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validate every route and flatten it into `(event, method, priority)` entries.
    ///
    /// Fails on the first malformed route without returning partial results.
    pub fn normalize(&self) -> EventResult<Vec<(EventKey, String, i32)>> {
        let mut normalized = Vec::new();
        for (event, spec) in &self.routes {
            if event.as_str().trim().is_empty() {
                return Err(invalid("empty event name"));
            }
            let entries = spec.entries().map_err(|error| prefix(event.as_str(), error))?;
            normalized.extend(
                entries
                    .into_iter()
                    .map(|(method, priority)| (event.clone(), method.to_string(), priority)),
            );
        }
        Ok(normalized)
    }
}

fn prefix(event: &str, error: EventError) -> EventError {
    match error {
        EventError::InvalidInput(reason) => {
            EventError::InvalidInput(format!("route \"{event}\": {reason}"))
        }
        other => other,
    }
}
