//! Errors a service reports from its own init or shutdown hook

use crate::di::InterfaceId;
use crate::error::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    /// A service the hook depends on is not registered
    #[error("Required service {0} is not registered")]
    MissingService(InterfaceId),

    /// The hook was handed an object of another type than its implementation
    #[error("Service object is not a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LifecycleError {
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitFailed(msg.into())
    }

    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }

    pub fn missing<I: ?Sized + 'static>() -> Self {
        Self::MissingService(InterfaceId::of::<I>())
    }

    pub(crate) fn type_mismatch<T: 'static>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// The unregistered service a hook gave up on, if that is why it failed
    pub fn missing_service(&self) -> Option<InterfaceId> {
        match self {
            Self::MissingService(interface) => Some(*interface),
            _ => None,
        }
    }
}

/// Lets hooks use `?` on registry lookups
impl From<ServiceError> for LifecycleError {
    fn from(error: ServiceError) -> Self {
        Self::Other(anyhow::Error::new(error))
    }
}
