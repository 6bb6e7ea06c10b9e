use crate::di::{InterfaceId, ServiceInstance};
use crate::error::Result;
use crate::registration::ServiceRegistration;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A named map from interface to the registration that provides it.
///
/// Registrations are cloned out of the map before they are called so no
/// shard lock is held while a service is being constructed.
pub struct Context {
    name: String,
    registrations: DashMap<InterfaceId, Arc<dyn ServiceRegistration>>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrations: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, interface: &InterfaceId) -> Option<Arc<dyn ServiceRegistration>> {
        self.registrations
            .get(interface)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or replace the registration for `interface`
    pub fn set(
        &self,
        interface: InterfaceId,
        registration: Arc<dyn ServiceRegistration>,
    ) -> Option<Arc<dyn ServiceRegistration>> {
        self.registrations.insert(interface, registration)
    }

    pub fn remove(&self, interface: &InterfaceId) -> bool {
        self.registrations.remove(interface).is_some()
    }

    pub fn contains(&self, interface: &InterfaceId) -> bool {
        self.registrations.contains_key(interface)
    }

    pub fn interfaces(&self) -> Vec<InterfaceId> {
        self.registrations.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn clear(&self) {
        self.registrations.clear();
    }

    /// Resolve the instance registered for `interface`, creating it if needed
    pub fn locate(&self, interface: &InterfaceId) -> Result<Option<ServiceInstance>> {
        match self.get(interface) {
            Some(registration) => registration.get_service(self),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("registrations", &self.registrations.len())
            .finish()
    }
}
