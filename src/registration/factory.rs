use super::{DEFAULT_GROUP, InstanceCell, RegistrationState, ServiceRegistration, ensure_supports};
use crate::binding::{Constructor, Implementation};
use crate::di::{Context, InterfaceId, ServiceInstance};
use crate::error::{Result, ServiceError};
use crate::host::SharedInstantiator;
use std::fmt;
use std::sync::Arc;

/// Builds its instance on first use
pub struct FactoryRegistration {
    interface: InterfaceId,
    implementation: Arc<Implementation>,
    group: i32,
    instantiator: Option<SharedInstantiator>,
    instance: InstanceCell,
}

impl FactoryRegistration {
    /// # Errors
    /// `Configuration` when `implementation` cannot be retrieved as `interface`.
    pub fn new(interface: InterfaceId, implementation: Arc<Implementation>) -> Result<Self> {
        ensure_supports(&implementation, &interface)?;
        Ok(Self {
            interface,
            implementation,
            group: DEFAULT_GROUP,
            instantiator: None,
            instance: InstanceCell::new(),
        })
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    /// Collaborator used for host-managed implementations
    pub fn with_instantiator(mut self, instantiator: Option<SharedInstantiator>) -> Self {
        self.instantiator = instantiator;
        self
    }
}

/// Create a fresh instance of `implementation`
pub(crate) fn construct_instance(
    implementation: &Arc<Implementation>,
    instantiator: Option<&SharedInstantiator>,
    interface: &InterfaceId,
) -> Result<ServiceInstance> {
    let object = match implementation.constructor() {
        Constructor::Default(construct) => construct(),
        Constructor::HostManaged => {
            let instantiator = instantiator.ok_or_else(|| {
                ServiceError::configuration(format!(
                    "{} is host-managed but no host instantiator is configured",
                    implementation.name()
                ))
            })?;
            instantiator
                .instantiate(implementation, Some(interface.short_name()))
                .map_err(|e| {
                    ServiceError::configuration(format!(
                        "host failed to instantiate {}: {:#}",
                        implementation.name(),
                        e
                    ))
                })?
        }
        Constructor::None => {
            return Err(ServiceError::configuration(format!(
                "{} has no usable constructor",
                implementation.name()
            )));
        }
    };

    tracing::debug!(service = %interface, "Constructed {}", implementation.name());
    ServiceInstance::new(object, Arc::clone(implementation))
}

impl ServiceRegistration for FactoryRegistration {
    fn interface(&self) -> InterfaceId {
        self.interface
    }

    fn group(&self) -> i32 {
        self.group
    }

    fn state(&self) -> RegistrationState {
        self.instance.state()
    }

    fn implementation(&self) -> Option<&Arc<Implementation>> {
        Some(&self.implementation)
    }

    fn get_service(&self, _context: &Context) -> Result<Option<ServiceInstance>> {
        self.instance.get_or_create(|| {
            construct_instance(&self.implementation, self.instantiator.as_ref(), &self.interface)
                .map(Some)
        })
    }

    fn owned_instance(&self) -> Option<ServiceInstance> {
        self.instance.get()
    }
}

impl fmt::Debug for FactoryRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistration")
            .field("interface", &self.interface)
            .field("implementation", &self.implementation.name())
            .field("group", &self.group)
            .field("state", &self.state())
            .finish()
    }
}
