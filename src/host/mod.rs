//! Boundaries to the host environment
//!
//! The loader never creates host-managed objects or reads assets itself.
//! It asks a [`HostInstantiator`] or a [`ResourceLoader`] and works with
//! whatever comes back. Objects that already exist in the host are handed
//! over as a [`HostScene`].

mod scene;

pub use scene::{HostContainer, HostObject, HostScene};

use crate::binding::Implementation;
use crate::di::{AnyArc, InterfaceId};
use std::sync::Arc;

/// Creates instances of implementations marked host-managed
pub trait HostInstantiator: Send + Sync {
    /// `name` is the interface the instance is being created for
    fn instantiate(&self, implementation: &Implementation, name: Option<&str>) -> anyhow::Result<AnyArc>;
}

/// Looks up pre-configured service objects by logical path
pub trait ResourceLoader: Send + Sync {
    /// `None` is a miss
    fn load(&self, path: &str, interface: &InterfaceId) -> Option<AnyArc>;
}

impl<F> ResourceLoader for F
where
    F: Fn(&str, &InterfaceId) -> Option<AnyArc> + Send + Sync,
{
    fn load(&self, path: &str, interface: &InterfaceId) -> Option<AnyArc> {
        self(path, interface)
    }
}

pub type SharedInstantiator = Arc<dyn HostInstantiator>;
pub type SharedResourceLoader = Arc<dyn ResourceLoader>;
