//! Ordered composition of listener providers

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::event::{Event, EventKey, NamedEvent};
use crate::registry::{ListenerProvider, Listeners};

/// Listener provider that concatenates sub-providers in attach order.
///
/// Priorities are never merged across providers: every listener of the first
/// provider runs before any listener of the second.
#[derive(Clone, Default)]
pub struct ListenerProviderAggregate {
    providers: Vec<Arc<dyn ListenerProvider>>,
}

impl ListenerProviderAggregate {
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn ListenerProvider>>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
        }
    }

    /// Append a provider after every provider attached so far
    pub fn attach(&mut self, provider: Arc<dyn ListenerProvider>) -> &mut Self {
        self.providers.push(provider);
        debug!(providers = self.providers.len(), "Attached listener provider");
        self
    }

    pub fn providers(&self) -> &[Arc<dyn ListenerProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ListenerProvider for ListenerProviderAggregate {
    fn listeners_for(&self, key: &EventKey) -> Listeners<'_> {
        let key = key.clone();
        Box::new(
            self.providers
                .iter()
                .flat_map(move |provider| provider.listeners_for(&key)),
        )
    }

    fn listeners_for_event(&self, event: &dyn Event) -> Listeners<'_> {
        let sequences: Vec<_> = self
            .providers
            .iter()
            .map(|provider| provider.listeners_for_event(event))
            .collect();
        Box::new(sequences.into_iter().flatten())
    }

    fn listeners_for_named(&self, named: &NamedEvent<'_>) -> Listeners<'_> {
        let sequences: Vec<_> = self
            .providers
            .iter()
            .map(|provider| provider.listeners_for_named(named))
            .collect();
        Box::new(sequences.into_iter().flatten())
    }
}

impl fmt::Debug for ListenerProviderAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerProviderAggregate")
            .field("providers", &self.providers.len())
            .finish()
    }
}
