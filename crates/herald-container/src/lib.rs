//! Service container for Herald
//!
//! This crate provides a small, lazily-resolving service container. Services are
//! registered as factories under string identifiers and are materialized on the
//! first [`Container::get`] for their identifier. Each resolved value is cached for
//! the lifetime of the container, so repeated lookups return the same instance.
//!
//! ## Quick Start
//!
//! ```rust
//! use herald_container::{ContainerExt, ServiceContainer};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     sent: Vec<String>,
//! }
//!
//! let mut builder = ServiceContainer::builder();
//! builder
//!     .register("mailer", |_| Ok(Mailer { sent: Vec::new() }))?
//!     .extend("mailer", |_, mailer: &mut Mailer| {
//!         mailer.sent.push("warmup".to_string());
//!         Ok(())
//!     })?;
//! let container = builder.build();
//!
//! let first = container.get_as::<Mailer>("mailer")?;
//! let second = container.get_as::<Mailer>("mailer")?;
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(first.sent, vec!["warmup".to_string()]);
//! assert!(!container.has("missing"));
//! # Ok::<(), herald_container::ContainerError>(())
//! ```
//!
//! ## Resolution rules
//!
//! - A cached value is returned as is and never replaced.
//! - An identifier without a factory fails with [`ContainerError::NotFound`].
//! - Factory or extension failures are wrapped into [`ContainerError::InvalidService`].
//! - Requesting an identifier from inside its own factory fails with
//!   [`ContainerError::CyclicDependency`].

pub mod container;
pub mod error;
pub mod provider;

use std::any::{type_name, Any};
use std::sync::Arc;

pub use container::{Service, ServiceContainer, ServiceContainerBuilder};
pub use error::{ContainerError, ContainerResult};
pub use provider::ServiceProvider;

/// Read access to a set of services keyed by identifier.
///
/// Implemented by [`ServiceContainer`] and by anything that fronts one, so that
/// consumers can depend on lookups without knowing how services are built.
pub trait Container: Send + Sync {
    /// Returns true if `get(id)` can produce a value.
    fn has(&self, id: &str) -> bool;

    /// Resolves the service registered under `id`.
    fn get(&self, id: &str) -> ContainerResult<Service>;
}

/// Typed lookups on top of [`Container`]
pub trait ContainerExt: Container {
    /// Resolves `id` and downcasts it to `T`.
    fn get_as<T>(&self, id: &str) -> ContainerResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}
