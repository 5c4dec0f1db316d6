//! Error types for the service container

/// Errors that can occur while registering or resolving services
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// No factory or alias is registered under the identifier
    #[error("Service \"{id}\" not found")]
    NotFound { id: String },

    /// The factory or the extension for the identifier failed.
    ///
    /// The underlying cause is kept as the error source.
    #[error("Invalid service \"{id}\": {source}")]
    InvalidService {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The identifier was requested again while its own factory was still running
    #[error("Cyclic dependency detected while resolving \"{id}\"")]
    CyclicDependency { id: String },

    /// The resolved value is not of the requested type
    #[error("Service \"{id}\" is not a {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    #[error("Service already registered: {id}")]
    AlreadyRegistered { id: String },
}

impl ContainerError {
    /// Identifier the error refers to
    pub fn id(&self) -> &str {
        match self {
            Self::NotFound { id }
            | Self::InvalidService { id, .. }
            | Self::CyclicDependency { id }
            | Self::TypeMismatch { id, .. }
            | Self::AlreadyRegistered { id } => id,
        }
    }
}

pub type ContainerResult<T> = Result<T, ContainerError>;
