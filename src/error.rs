use crate::di::InterfaceId;
use crate::lifecycle::LifecycleError;
use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Fatal: aborts the whole load cycle.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to cast service to: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Unable to load required resource for {interface} at '{path}'")]
    ResourceLoad { interface: InterfaceId, path: String },

    #[error("Failed to unregister {interface}: {source}")]
    Unregister {
        interface: InterfaceId,
        #[source]
        source: LifecycleError,
    },

    #[error("Initialization of {interface} failed: {source}")]
    Initialization {
        interface: InterfaceId,
        #[source]
        source: LifecycleError,
    },

    #[error("Initialization of {interface} timed out after {millis}ms")]
    InitTimeout { interface: InterfaceId, millis: u64 },

    #[error("Service loader has already unloaded its services")]
    LoaderUnloaded,

    #[error("Service loader was disposed after loading")]
    LoaderDisposed,

    #[error("Registration hook failed: {0}")]
    Hook(#[from] anyhow::Error),

    #[error("Invalid configuration document: {0}")]
    ConfigDocument(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(type_name: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            type_name: type_name.into(),
        }
    }

    pub fn downcast_failed(type_name: impl Into<String>) -> Self {
        Self::DowncastFailed {
            type_name: type_name.into(),
        }
    }

    /// The service the error is about, when it concerns a single one
    pub fn interface(&self) -> Option<InterfaceId> {
        match self {
            Self::ResourceLoad { interface, .. }
            | Self::Unregister { interface, .. }
            | Self::Initialization { interface, .. }
            | Self::InitTimeout { interface, .. } => Some(*interface),
            _ => None,
        }
    }
}
