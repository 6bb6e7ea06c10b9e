use crate::binding::Implementation;
use crate::di::{AnyArc, InterfaceId};
use crate::error::{Result, ServiceError};
use std::fmt;
use std::sync::Arc;

/// A live service object together with the description of its type.
#[derive(Clone)]
pub struct ServiceInstance {
    object: AnyArc,
    implementation: Arc<Implementation>,
}

impl ServiceInstance {
    pub fn new(object: AnyArc, implementation: Arc<Implementation>) -> Result<Self> {
        if !implementation.accepts(&object) {
            return Err(ServiceError::configuration(format!(
                "object is not an instance of {}",
                implementation.name()
            )));
        }
        Ok(Self {
            object,
            implementation,
        })
    }

    /// Caller guarantees `object` is an instance of `implementation`
    pub(crate) fn from_parts(object: AnyArc, implementation: Arc<Implementation>) -> Self {
        Self {
            object,
            implementation,
        }
    }

    pub fn object(&self) -> &AnyArc {
        &self.object
    }

    pub fn implementation(&self) -> &Arc<Implementation> {
        &self.implementation
    }

    pub fn type_name(&self) -> &'static str {
        self.implementation.name()
    }

    pub fn supports(&self, interface: &InterfaceId) -> bool {
        self.implementation.supports(interface)
    }

    /// View the instance as `I`
    pub fn cast<I: ?Sized + 'static>(&self) -> Result<Arc<I>> {
        self.implementation
            .casts()
            .cast_to::<I>(&self.object)
            .ok_or_else(|| ServiceError::downcast_failed(std::any::type_name::<I>()))
    }

    /// True when both handles point at the same object
    pub fn ptr_eq(&self, other: &ServiceInstance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("type", &self.type_name())
            .finish()
    }
}
