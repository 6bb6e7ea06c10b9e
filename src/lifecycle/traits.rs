//! Service hook traits
//!
//! A service opts into initialization by implementing exactly one of
//! [`InitService`] or [`AsyncInitService`] and declaring it on its
//! [`Implementation`](crate::binding::Implementation). The loader calls the
//! hook once, after every service of the load cycle has been registered.

use super::LifecycleError;
use crate::di::Registry;
use async_trait::async_trait;

/// Synchronous initialization
///
/// The loader advances to the next service as soon as this returns.
///
/// # Example
///
/// ```rust,ignore
/// impl InitService for CounterService {
///     fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
///         self.display = services.get::<dyn Display>();
///         Ok(())
///     }
/// }
/// ```
pub trait InitService: Send + Sync {
    fn init_service(&self, services: &Registry) -> Result<(), LifecycleError>;
}

/// Asynchronous initialization
///
/// The loader suspends the whole pipeline until the returned future
/// completes. A future that never completes stalls loading unless an init
/// timeout is configured.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl AsyncInitService for AssetCatalog {
///     async fn init_service_async(&self, _services: &Registry) -> Result<(), LifecycleError> {
///         self.fetch_manifest().await
///             .map_err(|e| LifecycleError::init_failed(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncInitService: Send + Sync {
    async fn init_service_async(&self, services: &Registry) -> Result<(), LifecycleError>;
}

/// Called when the service is unregistered during unload
///
/// Services are torn down in **reverse** init order. A failure is logged
/// and does not stop the remaining services from being unregistered.
pub trait ShutdownService: Send + Sync {
    fn shutdown_service(&self) -> Result<(), LifecycleError>;
}

/// Optional notifications for targets of dependency injection
///
/// Each hook runs at most once per injection pass.
pub trait InjectionEvents: Send + Sync {
    /// Injection was postponed because services are not ready yet; the
    /// target has been queued and will be retried.
    fn on_waiting_for_services(&self) {}

    /// Called immediately before the first member is injected
    fn on_will_inject(&self) {}

    /// Called after the injection pass finished
    fn on_did_inject(&self) {}
}
