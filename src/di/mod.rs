//! Service registry and dependency injection
//!
//! A [`Registry`] holds named [`Context`]s mapping each [`InterfaceId`] to the
//! registration that provides it. The [`DependencyInjector`] fills
//! [`Inject`] members of arbitrary objects from the active context.

mod cast;
mod context;
mod inject;
mod injectable;
mod injector;
mod instance;
mod interface;
mod registry;
mod status;

pub use cast::{AnyArc, CastTable};
pub use context::Context;
pub use inject::Inject;
pub use injectable::{Injectable, InjectionPoint};
pub use injector::{DependencyInjector, InjectionOutcome};
pub use instance::ServiceInstance;
pub use interface::InterfaceId;
pub use registry::Registry;
pub use status::{InitStatus, StatusObserver, SubscriptionId};
