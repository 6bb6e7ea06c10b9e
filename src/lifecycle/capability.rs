//! Init capability tags
//!
//! Whether a service initializes synchronously, asynchronously or not at
//! all is decided once, when its [`Implementation`](crate::binding::Implementation)
//! is described, and stored as an [`Initializer`] variant. The loader
//! dispatches on that variant instead of probing the instance.

use super::{AsyncInitService, InitService, LifecycleError, ShutdownService};
use crate::di::{AnyArc, Registry};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

pub type InitFuture = Pin<Box<dyn Future<Output = Result<(), LifecycleError>> + Send>>;

type SyncInitFn = Arc<dyn Fn(&AnyArc, &Registry) -> Result<(), LifecycleError> + Send + Sync>;
type AsyncInitFn = Arc<dyn Fn(AnyArc, Registry) -> InitFuture + Send + Sync>;
type ShutdownFn = Arc<dyn Fn(&AnyArc) -> Result<(), LifecycleError> + Send + Sync>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InitCapability {
    #[default]
    None,
    Sync,
    Async,
}

#[derive(Clone, Default)]
pub enum Initializer {
    #[default]
    None,
    Sync(SyncInitFn),
    Async(AsyncInitFn),
}

impl Initializer {
    pub fn sync<T: InitService + Any>() -> Self {
        Self::Sync(Arc::new(|object: &AnyArc, services: &Registry| {
            let service = object
                .clone()
                .downcast::<T>()
                .map_err(|_| LifecycleError::type_mismatch::<T>())?;
            service.init_service(services)
        }))
    }

    pub fn from_async<T: AsyncInitService + Any>() -> Self {
        Self::Async(Arc::new(|object: AnyArc, services: Registry| {
            let service = object.downcast::<T>();
            Box::pin(async move {
                let service = service.map_err(|_| LifecycleError::type_mismatch::<T>())?;
                service.init_service_async(&services).await
            })
        }))
    }

    pub fn capability(&self) -> InitCapability {
        match self {
            Self::None => InitCapability::None,
            Self::Sync(_) => InitCapability::Sync,
            Self::Async(_) => InitCapability::Async,
        }
    }

    /// Runs the hook; completes once the service finished initializing.
    pub async fn run(&self, object: &AnyArc, services: &Registry) -> Result<(), LifecycleError> {
        match self {
            Self::None => Ok(()),
            Self::Sync(init) => init(object, services),
            Self::Async(init) => init(object.clone(), services.clone()).await,
        }
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Initializer::{}", self.capability())
    }
}

#[derive(Clone)]
pub struct ShutdownHook(ShutdownFn);

impl ShutdownHook {
    pub fn of<T: ShutdownService + Any>() -> Self {
        Self(Arc::new(|object: &AnyArc| {
            let service = object
                .clone()
                .downcast::<T>()
                .map_err(|_| LifecycleError::type_mismatch::<T>())?;
            service.shutdown_service()
        }))
    }

    pub fn run(&self, object: &AnyArc) -> Result<(), LifecycleError> {
        (self.0)(object)
    }
}

impl fmt::Debug for ShutdownHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShutdownHook")
    }
}
