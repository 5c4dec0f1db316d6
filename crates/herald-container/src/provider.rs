//! Service Provider trait
//!
//! A `ServiceProvider` bundles the factories and extensions of one feature so they
//! can be registered together on a [`ServiceContainerBuilder`].
//!
//! ## Usage
//!
//! ```rust
//! use herald_container::{ContainerResult, ServiceContainer, ServiceContainerBuilder, ServiceProvider};
//!
//! struct GreetingProvider;
//!
//! impl ServiceProvider for GreetingProvider {
//!     fn name(&self) -> &'static str {
//!         "greeting"
//!     }
//!
//!     fn register(&self, builder: &mut ServiceContainerBuilder) -> ContainerResult<()> {
//!         builder.register("greeting", |_| Ok(String::from("hello")))?;
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = ServiceContainer::builder();
//! builder.provider(&GreetingProvider)?;
//! assert!(builder.build().has("greeting"));
//! # Ok::<(), herald_container::ContainerError>(())
//! ```

use crate::container::ServiceContainerBuilder;
use crate::error::ContainerResult;

/// Trait for types that contribute services to a container.
pub trait ServiceProvider: Send + Sync {
    /// Returns the name of this service provider.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Register factories, aliases and extensions on the builder.
    fn register(&self, builder: &mut ServiceContainerBuilder) -> ContainerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContainerError, ContainerExt, ServiceContainer};

    struct CounterProvider {
        start: u32,
    }

    impl ServiceProvider for CounterProvider {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn register(&self, builder: &mut ServiceContainerBuilder) -> ContainerResult<()> {
            let start = self.start;
            builder
                .register("counter", move |_| Ok(start))?
                .extend("counter", |_, value: &mut u32| {
                    *value += 1;
                    Ok(())
                })?;
            Ok(())
        }
    }

    #[test]
    fn test_provider_registers_services() {
        let mut builder = ServiceContainer::builder();
        builder.provider(&CounterProvider { start: 41 }).unwrap();
        let container = builder.build();

        let value = container.get_as::<u32>("counter").unwrap();
        assert_eq!(*value, 42);
    }

    #[test]
    fn test_provider_conflicts_are_reported() {
        let mut builder = ServiceContainer::builder();
        builder.provider(&CounterProvider { start: 1 }).unwrap();

        let result = builder.provider(&CounterProvider { start: 2 });
        assert!(matches!(
            result,
            Err(ContainerError::AlreadyRegistered { .. })
        ));
    }
}
