use crate::binding::Implementation;
use crate::di::{AnyArc, InterfaceId};
use crate::registration::ServiceRegistration;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// An object that exists in the host independently of the loader
#[derive(Clone)]
pub struct HostObject {
    object: Weak<dyn Any + Send + Sync>,
    implementation: Arc<Implementation>,
    markers: Vec<InterfaceId>,
    structural: bool,
}

impl HostObject {
    pub fn new(object: &AnyArc, implementation: Arc<Implementation>) -> Self {
        Self {
            object: Arc::downgrade(object),
            implementation,
            markers: Vec::new(),
            structural: false,
        }
    }

    /// Part of the container's plumbing rather than a candidate service
    pub fn structural(object: &AnyArc, implementation: Arc<Implementation>) -> Self {
        Self {
            structural: true,
            ..Self::new(object, implementation)
        }
    }

    /// Register this object as `interface`
    pub fn marked_as(mut self, interface: InterfaceId) -> Self {
        if !self.markers.contains(&interface) {
            self.markers.push(interface);
        }
        self
    }

    pub fn object(&self) -> Option<AnyArc> {
        self.object.upgrade()
    }

    pub fn implementation(&self) -> &Arc<Implementation> {
        &self.implementation
    }

    pub fn markers(&self) -> &[InterfaceId] {
        &self.markers
    }

    pub fn is_structural(&self) -> bool {
        self.structural
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("type", &self.implementation.name())
            .field("markers", &self.markers)
            .field("structural", &self.structural)
            .finish()
    }
}

/// A group of host objects that together make up at most one service
#[derive(Debug, Clone, Default)]
pub struct HostContainer {
    name: String,
    objects: Vec<HostObject>,
    registration: Option<Arc<dyn ServiceRegistration>>,
}

impl HostContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_object(mut self, object: HostObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Use a custom registration for this container instead of inspecting its objects
    pub fn with_registration(mut self, registration: Arc<dyn ServiceRegistration>) -> Self {
        self.registration = Some(registration);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[HostObject] {
        &self.objects
    }

    pub fn registration(&self) -> Option<&Arc<dyn ServiceRegistration>> {
        self.registration.as_ref()
    }
}

/// Pre-existing host objects handed to a loader
#[derive(Debug, Clone, Default)]
pub struct HostScene {
    containers: Vec<HostContainer>,
}

impl HostScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: HostContainer) -> Self {
        self.containers.push(container);
        self
    }

    pub fn containers(&self) -> &[HostContainer] {
        &self.containers
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
