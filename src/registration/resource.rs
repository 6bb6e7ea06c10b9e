use super::factory::construct_instance;
use super::{DEFAULT_GROUP, InstanceCell, RegistrationState, ServiceRegistration, ensure_supports};
use crate::binding::{Implementation, ResourcePolicy};
use crate::di::{Context, InterfaceId, ServiceInstance};
use crate::error::{Result, ServiceError};
use crate::host::{SharedInstantiator, SharedResourceLoader};
use std::fmt;
use std::sync::Arc;

/// Prefers a pre-configured resource over constructing a new instance
pub struct ResourceRegistration {
    interface: InterfaceId,
    implementation: Arc<Implementation>,
    group: i32,
    policy: ResourcePolicy,
    path: String,
    resources: Option<SharedResourceLoader>,
    instantiator: Option<SharedInstantiator>,
    instance: InstanceCell,
}

impl ResourceRegistration {
    /// The resource is looked up at `<resource_root>/<InterfaceName>`
    /// unless `path_override` is given.
    pub fn new(
        interface: InterfaceId,
        implementation: Arc<Implementation>,
        policy: ResourcePolicy,
        resource_root: &str,
        path_override: Option<&str>,
    ) -> Result<Self> {
        ensure_supports(&implementation, &interface)?;
        let path = match path_override {
            Some(path) => path.to_string(),
            None => default_resource_path(resource_root, &interface),
        };
        Ok(Self {
            interface,
            implementation,
            group: DEFAULT_GROUP,
            policy,
            path,
            resources: None,
            instantiator: None,
            instance: InstanceCell::new(),
        })
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn with_resources(mut self, resources: Option<SharedResourceLoader>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_instantiator(mut self, instantiator: Option<SharedInstantiator>) -> Self {
        self.instantiator = instantiator;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }

    fn load_or_construct(&self) -> Result<ServiceInstance> {
        if self.policy != ResourcePolicy::None {
            let found = self
                .resources
                .as_ref()
                .and_then(|resources| resources.load(&self.path, &self.interface));
            if let Some(object) = found {
                tracing::debug!(service = %self.interface, path = %self.path, "Loaded service from resource");
                return ServiceInstance::new(object, Arc::clone(&self.implementation));
            }

            let miss = ServiceError::ResourceLoad {
                interface: self.interface,
                path: self.path.clone(),
            };
            if self.policy == ResourcePolicy::Required {
                tracing::error!("{}; constructing a default instance instead", miss);
            } else {
                tracing::debug!("{}; constructing a default instance", miss);
            }
        }

        construct_instance(&self.implementation, self.instantiator.as_ref(), &self.interface)
    }
}

/// `<resource_root>/<InterfaceName>`
pub(crate) fn default_resource_path(resource_root: &str, interface: &InterfaceId) -> String {
    let root = resource_root.trim_end_matches('/');
    if root.is_empty() {
        interface.short_name().to_string()
    } else {
        format!("{}/{}", root, interface.short_name())
    }
}

impl ServiceRegistration for ResourceRegistration {
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
        self.instance.get_or_create(|| self.load_or_construct().map(Some))
    }

    fn owned_instance(&self) -> Option<ServiceInstance> {
        self.instance.get()
    }
}

impl fmt::Debug for ResourceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistration")
            .field("interface", &self.interface)
            .field("implementation", &self.implementation.name())
            .field("policy", &self.policy)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}
