//! # Loadout
//!
//! Runtime service composition: declarative bindings are resolved into a
//! deterministic set of singleton services, extra lookup interfaces are
//! proxied onto a single instance, and services are initialized strictly
//! one after another, async initializers included.
//!
//! ## Features
//!
//! - **Prioritized bindings**: competing bindings for one interface are
//!   settled by priority, the losers are logged
//! - **Proxy interfaces**: one instance, many lookup interfaces
//! - **Deterministic init order**: `(group, primary before proxy, interface name)`
//! - **Named contexts**: isolated registries, one active at a time
//! - **Deferred injection**: `Inject<T>` members are filled as soon as the
//!   registry becomes ready
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use loadout::prelude::*;
//!
//! pub trait CounterApi: Send + Sync {
//!     fn value(&self) -> u32;
//! }
//!
//! // 1. Describe the service
//! #[derive(Default, Service)]
//! #[service(interface = dyn CounterApi, init = sync)]
//! pub struct CounterService { /* ... */ }
//!
//! impl CounterApi for CounterService {
//!     fn value(&self) -> u32 { 0 }
//! }
//!
//! impl InitService for CounterService {
//!     fn init_service(&self, _services: &Registry) -> Result<(), LifecycleError> {
//!         Ok(())
//!     }
//! }
//!
//! // 2. Something that needs it
//! #[derive(Injectable)]
//! pub struct CounterDisplay {
//!     counter: Inject<dyn CounterApi>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> loadout::Result<()> {
//!     let registry = Registry::new();
//!     let injector = DependencyInjector::new(registry.clone());
//!
//!     // 3. Injection before loading is deferred until services are ready
//!     let display = Arc::new(CounterDisplay { counter: Inject::empty() });
//!     injector.inject_dependencies(&display);
//!
//!     // 4. Load
//!     let mut loader = ServiceLoader::builder(registry.clone())
//!         .source(BindingCatalog::new().with::<CounterService>())
//!         .build();
//!     loader.load_services(false).await?;
//!
//!     assert!(display.counter.is_set());
//!     Ok(())
//! }
//! ```

// lets the derive macros refer to `::loadout` from inside this crate's tests
extern crate self as loadout;

pub mod binding;
pub mod config;
pub mod di;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod registration;

// Re-export core types
pub use binding::{Binding, BindingCatalog, BindingSource, Implementation, ProxyPolicy, RegisterService, ResourcePolicy};
pub use config::{ConfigService, LoaderConfig};
pub use di::{DependencyInjector, Inject, Injectable, InitStatus, InterfaceId, Registry};
pub use error::{Result, ServiceError};
pub use loader::{LoadOutcome, LoadReport, LoaderState, ServiceLoader};
pub use registration::ServiceRegistration;

// Re-export macros
pub use loadout_macro::{Injectable as DeriveInjectable, Service as DeriveService};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use loadout::prelude::*;
/// ```
pub mod prelude {
    pub use crate::binding::{
        Binding, BindingCatalog, BindingResolver, BindingSource, Implementation, ProxyPolicy,
        RegisterService, ResourcePolicy,
    };
    pub use crate::config::{ConfigService, LoaderConfig};
    pub use crate::di::{
        DependencyInjector, Inject, Injectable, InjectionOutcome, InitStatus, InterfaceId, Registry,
    };
    pub use crate::error::{Result, ServiceError};
    pub use crate::host::{HostContainer, HostInstantiator, HostObject, HostScene, ResourceLoader};
    pub use crate::lifecycle::{
        AsyncInitService, InitCapability, InitService, InjectionEvents, LifecycleError,
        ShutdownHandler, ShutdownService, shutdown_signal,
    };
    pub use crate::loader::{LoadOutcome, LoadReport, LoaderState, ServiceLoader};
    pub use crate::registration::{
        DirectRegistration, FactoryRegistration, HostedRegistration, ProxyRegistration,
        RegistrationSet, ResourceRegistration, ServiceRegistration,
    };
    pub use crate::{DeriveInjectable as Injectable, DeriveService as Service};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
