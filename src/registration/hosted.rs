use super::{DEFAULT_GROUP, RegistrationState, ServiceRegistration, ensure_supports};
use crate::binding::Implementation;
use crate::di::{AnyArc, Context, InterfaceId, ServiceInstance};
use crate::error::{Result, ServiceError};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// A service object owned by the host.
///
/// Only a weak reference is kept; once the host drops the object the
/// registration stops producing it.
pub struct HostedRegistration {
    interface: InterfaceId,
    implementation: Arc<Implementation>,
    group: i32,
    object: Weak<dyn Any + Send + Sync>,
}

impl HostedRegistration {
    /// # Errors
    /// `Configuration` when `object` is not an instance of `implementation`
    /// or cannot be retrieved as `interface`.
    pub fn new(interface: InterfaceId, object: &AnyArc, implementation: Arc<Implementation>) -> Result<Self> {
        if !implementation.accepts(object) {
            return Err(ServiceError::configuration(format!(
                "host object is not an instance of {}",
                implementation.name()
            )));
        }
        ensure_supports(&implementation, &interface)?;
        Ok(Self {
            interface,
            implementation,
            group: DEFAULT_GROUP,
            object: Arc::downgrade(object),
        })
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

impl ServiceRegistration for HostedRegistration {
    fn interface(&self) -> InterfaceId {
        self.interface
    }

    fn group(&self) -> i32 {
        self.group
    }

    fn state(&self) -> RegistrationState {
        if self.is_alive() {
            RegistrationState::Instantiated
        } else {
            RegistrationState::Uninstantiated
        }
    }

    fn implementation(&self) -> Option<&Arc<Implementation>> {
        Some(&self.implementation)
    }

    fn get_service(&self, _context: &Context) -> Result<Option<ServiceInstance>> {
        match self.object.upgrade() {
            Some(object) => Ok(Some(ServiceInstance::from_parts(
                object,
                Arc::clone(&self.implementation),
            ))),
            None => {
                tracing::warn!(service = %self.interface, "Host object for service has been destroyed");
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for HostedRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedRegistration")
            .field("interface", &self.interface)
            .field("implementation", &self.implementation.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}
