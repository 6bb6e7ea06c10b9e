use super::{DEFAULT_GROUP, InstanceCell, RegistrationState, ServiceRegistration};
use crate::di::{Context, InterfaceId, Registry, ServiceInstance};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;

/// Makes the service registered for `proxied` also available as `interface`.
///
/// Never creates or tears down an instance and never runs init hooks; the
/// proxied registration does both.
#[derive(Debug)]
pub struct ProxyRegistration {
    interface: InterfaceId,
    proxied: InterfaceId,
    group: i32,
    target: InstanceCell,
}

impl ProxyRegistration {
    pub fn new(interface: InterfaceId, proxied: InterfaceId) -> Self {
        Self {
            interface,
            proxied,
            group: DEFAULT_GROUP,
            target: InstanceCell::new(),
        }
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn proxied(&self) -> InterfaceId {
        self.proxied
    }
}

#[async_trait]
impl ServiceRegistration for ProxyRegistration {
    fn interface(&self) -> InterfaceId {
        self.interface
    }

    fn group(&self) -> i32 {
        self.group
    }

    fn is_proxy(&self) -> bool {
        true
    }

    fn proxy_target(&self) -> Option<InterfaceId> {
        Some(self.proxied)
    }

    fn state(&self) -> RegistrationState {
        self.target.state()
    }

    fn get_service(&self, context: &Context) -> Result<Option<ServiceInstance>> {
        self.target.get_or_create(|| {
            let Some(instance) = context.locate(&self.proxied)? else {
                return Ok(None);
            };
            if !instance.supports(&self.interface) {
                return Err(ServiceError::configuration(format!(
                    "{} (proxied by {}) cannot be retrieved as {}",
                    instance.type_name(),
                    self.proxied,
                    self.interface
                )));
            }
            Ok(Some(instance))
        })
    }

    async fn init_service(&self, _context: &Context, _services: &Registry) -> Result<()> {
        Ok(())
    }

    fn unregister(&self, context: &Context) -> Result<bool> {
        Ok(context.remove(&self.interface))
    }
}
