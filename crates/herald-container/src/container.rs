//! Lazy, caching service container

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use anyhow::anyhow;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::error::{ContainerError, ContainerResult};
use crate::provider::ServiceProvider;
use crate::Container;

/// A resolved, shareable service instance
pub type Service = Arc<dyn Any + Send + Sync>;

type BoxedService = Box<dyn Any + Send + Sync>;

type Factory = Box<dyn Fn(&ServiceContainer) -> anyhow::Result<BoxedService> + Send + Sync>;

type Extension =
    Box<dyn Fn(&ServiceContainer, &mut (dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

enum Definition {
    Factory(Factory),
    Alias(String),
}

/// Cache state of one identifier
enum Slot {
    /// Factory is running on the given thread
    Building(ThreadId),
    Ready(Service),
}

/// Service container with single-instance caching.
///
/// Definitions are fixed once the container is built. The cache is the only
/// mutable state; it is filled on first resolution of each identifier and never
/// evicted.
pub struct ServiceContainer {
    definitions: HashMap<String, Definition>,
    extensions: HashMap<String, Extension>,
    slots: Mutex<HashMap<String, Slot>>,
    built: Condvar,
}

impl ServiceContainer {
    /// Create a builder for a new container
    pub fn builder() -> ServiceContainerBuilder {
        ServiceContainerBuilder::new()
    }

    /// Returns true if the identifier is cached or has a registered definition.
    pub fn has(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
            || matches!(self.slots.lock().get(id), Some(Slot::Ready(_)))
    }

    /// Resolve a service, constructing and caching it on first use.
    ///
    /// Concurrent requests for an identifier that another thread is building wait
    /// for that construction instead of running the factory a second time.
    pub fn get(&self, id: &str) -> ContainerResult<Service> {
        let current = thread::current().id();

        let definition = {
            let mut slots = self.slots.lock();
            loop {
                let owner = match slots.get(id) {
                    Some(Slot::Ready(service)) => return Ok(Arc::clone(service)),
                    Some(Slot::Building(owner)) => *owner,
                    None => break,
                };
                if owner == current {
                    return Err(ContainerError::CyclicDependency { id: id.to_string() });
                }
                self.built.wait(&mut slots);
            }

            let definition = self
                .definitions
                .get(id)
                .ok_or_else(|| ContainerError::NotFound { id: id.to_string() })?;
            slots.insert(id.to_string(), Slot::Building(current));
            definition
        };

        let guard = BuildGuard {
            container: self,
            id,
            done: false,
        };
        let service = self.construct(id, definition)?;
        Ok(guard.complete(service))
    }

    /// Identifiers of every registered definition
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn construct(&self, id: &str, definition: &Definition) -> ContainerResult<Service> {
        match definition {
            Definition::Alias(target) => {
                debug!(alias = id, target = %target, "Resolving service alias");
                self.get(target)
            }
            Definition::Factory(factory) => {
                let mut value = factory(self).map_err(|source| ContainerError::InvalidService {
                    id: id.to_string(),
                    source,
                })?;

                if let Some(extension) = self.extensions.get(id) {
                    extension(self, &mut *value).map_err(|source| {
                        ContainerError::InvalidService {
                            id: id.to_string(),
                            source,
                        }
                    })?;
                    debug!(service = id, "Applied service extension");
                }

                debug!(service = id, "Constructed service");
                Ok(Arc::from(value))
            }
        }
    }
}

impl Container for ServiceContainer {
    fn has(&self, id: &str) -> bool {
        ServiceContainer::has(self, id)
    }

    fn get(&self, id: &str) -> ContainerResult<Service> {
        ServiceContainer::get(self, id)
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("ServiceContainer")
            .field("services", &ids)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Clears the under-construction marker unless the build completed, so a failed
/// or panicking factory never leaves waiters blocked.
struct BuildGuard<'a> {
    container: &'a ServiceContainer,
    id: &'a str,
    done: bool,
}

impl BuildGuard<'_> {
    fn complete(mut self, service: Service) -> Service {
        let mut slots = self.container.slots.lock();
        slots.insert(self.id.to_string(), Slot::Ready(Arc::clone(&service)));
        self.done = true;
        self.container.built.notify_all();
        service
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut slots = self.container.slots.lock();
        slots.remove(self.id);
        self.container.built.notify_all();
    }
}

/// Builder for [`ServiceContainer`]
pub struct ServiceContainerBuilder {
    definitions: HashMap<String, Definition>,
    extensions: HashMap<String, Extension>,
}

impl ServiceContainerBuilder {
    /// Create a new, empty builder
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Register a factory under `id`.
    ///
    /// The factory receives the container so it can resolve its own dependencies.
    pub fn register<T, F>(&mut self, id: impl Into<String>, factory: F) -> ContainerResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceContainer) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let id = id.into();
        self.ensure_vacant(&id)?;

        let factory: Factory = Box::new(
            move |container: &ServiceContainer| -> anyhow::Result<BoxedService> {
                Ok(Box::new(factory(container)?))
            },
        );

        debug!(service = %id, service_type = type_name::<T>(), "Registered service factory");
        self.definitions.insert(id, Definition::Factory(factory));
        Ok(self)
    }

    /// Register `alias` as another name for `target`.
    ///
    /// Both identifiers resolve to the same cached instance.
    pub fn alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> ContainerResult<&mut Self> {
        let alias = alias.into();
        let target = target.into();
        self.ensure_vacant(&alias)?;

        debug!(alias = %alias, target = %target, "Registered service alias");
        self.definitions.insert(alias, Definition::Alias(target));
        Ok(self)
    }

    /// Register a post-construction extension for `id`.
    ///
    /// The extension runs once, right after the factory, and mutates the value in
    /// place before it is cached. Extensions on aliases are never applied.
    pub fn extend<T, F>(&mut self, id: impl Into<String>, extension: F) -> ContainerResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceContainer, &mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.extensions.contains_key(&id) {
            return Err(ContainerError::AlreadyRegistered { id });
        }

        let extension: Extension = Box::new(
            move |container: &ServiceContainer,
                  value: &mut (dyn Any + Send + Sync)|
                  -> anyhow::Result<()> {
                let value = value
                    .downcast_mut::<T>()
                    .ok_or_else(|| anyhow!("extension expects a {}", type_name::<T>()))?;
                extension(container, value)
            },
        );

        debug!(service = %id, "Registered service extension");
        self.extensions.insert(id, extension);
        Ok(self)
    }

    /// Let a [`ServiceProvider`] register its factories and extensions.
    pub fn provider(&mut self, provider: &dyn ServiceProvider) -> ContainerResult<&mut Self> {
        debug!(provider = provider.name(), "Registering service provider");
        provider.register(self)?;
        Ok(self)
    }

    /// Returns true if a definition exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Build the container
    pub fn build(self) -> ServiceContainer {
        info!(
            services = self.definitions.len(),
            extensions = self.extensions.len(),
            "Built service container"
        );
        ServiceContainer {
            definitions: self.definitions,
            extensions: self.extensions,
            slots: Mutex::new(HashMap::new()),
            built: Condvar::new(),
        }
    }

    fn ensure_vacant(&self, id: &str) -> ContainerResult<()> {
        if self.definitions.contains_key(id) {
            return Err(ContainerError::AlreadyRegistered { id: id.to_string() });
        }
        Ok(())
    }
}

impl Default for ServiceContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_failed_build_clears_marker() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let mut builder = ServiceContainer::builder();
        builder
            .register("flaky", move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("first attempt fails");
                }
                Ok(7u32)
            })
            .unwrap();
        let container = builder.build();

        assert!(matches!(
            container.get("flaky"),
            Err(ContainerError::InvalidService { .. })
        ));
        // A second attempt is not reported as a cycle
        let value = container.get("flaky").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_alias_shares_instance() {
        let mut builder = ServiceContainer::builder();
        builder
            .register("dispatcher", |_| Ok(String::from("dispatcher")))
            .unwrap()
            .alias("dispatcher.default", "dispatcher")
            .unwrap();
        let container = builder.build();

        let direct = container.get("dispatcher").unwrap();
        let aliased = container.get("dispatcher.default").unwrap();
        assert!(Arc::ptr_eq(&direct, &aliased));
        assert!(container.has("dispatcher.default"));
    }

    #[test]
    fn test_self_alias_is_cyclic() {
        let mut builder = ServiceContainer::builder();
        builder.alias("loop", "loop").unwrap();
        let container = builder.build();

        assert!(matches!(
            container.get("loop"),
            Err(ContainerError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let mut builder = ServiceContainer::builder();
        builder.extend("x", |_, _: &mut u8| Ok(())).unwrap();
        let result = builder.extend("x", |_, _: &mut u8| Ok(()));
        assert!(matches!(
            result,
            Err(ContainerError::AlreadyRegistered { .. })
        ));
    }
}
