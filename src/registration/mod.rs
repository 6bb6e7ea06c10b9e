//! Registrations: how one service instance is obtained for one interface
//!
//! | Variant | Instance comes from |
//! |---|---|
//! | [`DirectRegistration`] | a pre-built object |
//! | [`FactoryRegistration`] | the implementation's constructor or the host instantiator |
//! | [`ResourceRegistration`] | the resource loader, falling back to construction |
//! | [`ProxyRegistration`] | another interface in the same context |
//! | [`HostedRegistration`] | a weakly held object owned by the host |

mod direct;
mod factory;
mod hosted;
mod proxy;
mod resource;
mod set;

pub use direct::DirectRegistration;
pub use factory::FactoryRegistration;
pub use hosted::HostedRegistration;
pub use proxy::ProxyRegistration;
pub use resource::ResourceRegistration;
pub use set::{RegistrationSet, compare_registrations};

use crate::binding::Implementation;
use crate::di::{Context, InterfaceId, Registry, ServiceInstance};
use crate::error::{Result, ServiceError};
use crate::lifecycle::InitCapability;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use strum_macros::{Display, EnumString};

/// Group used when a binding does not name one
pub const DEFAULT_GROUP: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Uninstantiated,
    Instantiated,
}

/// Describes how to obtain the single instance registered for one interface.
///
/// A registration creates its instance at most once; later calls to
/// [`get_service`](ServiceRegistration::get_service) return the same object.
#[async_trait]
pub trait ServiceRegistration: Send + Sync + fmt::Debug {
    /// The interface this registration is found under
    fn interface(&self) -> InterfaceId;

    fn group(&self) -> i32;

    fn is_proxy(&self) -> bool {
        false
    }

    /// For proxies, the interface whose registration supplies the instance
    fn proxy_target(&self) -> Option<InterfaceId> {
        None
    }

    fn state(&self) -> RegistrationState;

    fn implementation(&self) -> Option<&Arc<Implementation>> {
        None
    }

    fn init_capability(&self) -> InitCapability {
        self.implementation()
            .map(|implementation| implementation.capability())
            .unwrap_or_default()
    }

    /// Return the instance, creating it on first use
    ///
    /// `Ok(None)` means the registration has nothing to offer.
    fn get_service(&self, context: &Context) -> Result<Option<ServiceInstance>>;

    /// The instance this registration created and is responsible for tearing down
    fn owned_instance(&self) -> Option<ServiceInstance> {
        None
    }

    /// Run the instance's init hook; completes once the service finished initializing
    async fn init_service(&self, context: &Context, services: &Registry) -> Result<()> {
        let Some(instance) = self.get_service(context)? else {
            return Ok(());
        };
        instance
            .implementation()
            .initializer()
            .run(instance.object(), services)
            .await
            .map_err(|source| ServiceError::Initialization {
                interface: self.interface(),
                source,
            })
    }

    /// Remove this registration from `context` and tear down its instance
    ///
    /// Returns whether the context held the registration.
    fn unregister(&self, context: &Context) -> Result<bool> {
        let removed = context.remove(&self.interface());

        if let Some(instance) = self.owned_instance() {
            if let Some(hook) = instance.implementation().shutdown_hook() {
                hook.run(instance.object())
                    .map_err(|source| ServiceError::Unregister {
                        interface: self.interface(),
                        source,
                    })?;
            }
        }

        Ok(removed)
    }
}

/// The one instance a registration creates
///
/// Creation is serialized, so concurrent first lookups build a single
/// instance. A failed or empty creation leaves the cell unset and the next
/// lookup tries again.
#[derive(Default)]
pub(crate) struct InstanceCell {
    instance: OnceLock<ServiceInstance>,
    creating: Mutex<()>,
}

impl InstanceCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ServiceInstance> {
        self.instance.get().cloned()
    }

    pub fn state(&self) -> RegistrationState {
        if self.instance.get().is_some() {
            RegistrationState::Instantiated
        } else {
            RegistrationState::Uninstantiated
        }
    }

    pub fn get_or_create<F>(&self, create: F) -> Result<Option<ServiceInstance>>
    where
        F: FnOnce() -> Result<Option<ServiceInstance>>,
    {
        if let Some(instance) = self.instance.get() {
            return Ok(Some(instance.clone()));
        }

        let _creating = self.creating.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = self.instance.get() {
            return Ok(Some(instance.clone()));
        }
        Ok(create()?.map(|instance| self.instance.get_or_init(|| instance).clone()))
    }
}

impl fmt::Debug for InstanceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state())
    }
}

/// Fails unless `implementation` can be retrieved as `interface`
pub(crate) fn ensure_supports(implementation: &Implementation, interface: &InterfaceId) -> Result<()> {
    if implementation.supports(interface) {
        Ok(())
    } else {
        Err(ServiceError::configuration(format!(
            "{} does not implement registration interface {}",
            implementation.name(),
            interface
        )))
    }
}
