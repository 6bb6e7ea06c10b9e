//! Declarative service bindings
//!
//! A [`Binding`] says which [`Implementation`] provides an interface, how
//! important it is relative to competing bindings, and which additional
//! interfaces should resolve to the same instance. Bindings come from a
//! [`BindingSource`] (usually the types annotated with `#[derive(Service)]`)
//! and are turned into registrations by the [`BindingResolver`].

mod catalog;
mod implementation;
mod resolver;

pub use catalog::{BindingCatalog, BindingSource, RegisterService};
pub use implementation::{Constructor, Implementation, ImplementationBuilder};
pub use resolver::BindingResolver;

use crate::di::InterfaceId;
use crate::error::Result;
use crate::registration::{DEFAULT_GROUP, ensure_supports};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Whether a service is looked up as a pre-configured resource before being constructed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourcePolicy {
    /// Always construct
    #[default]
    None,
    /// A missing resource is logged as an error before falling back to construction
    Required,
    /// A missing resource silently falls back to construction
    Preferred,
}

/// Which of the implementation's interfaces also resolve to the service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProxyPolicy {
    /// Declared interfaces, unless an explicit proxy list is given
    #[default]
    DeclaredOnTypeIfNoExplicitProxies,
    DeclaredOnType,
    DeclaredOnTypeAndAncestors,
    ExplicitListOnly,
}

/// An immutable request to provide `interface` with `implementation`
#[derive(Debug, Clone)]
pub struct Binding {
    interface: InterfaceId,
    implementation: Arc<Implementation>,
    priority: i32,
    group: i32,
    resource_policy: ResourcePolicy,
    resource_path: Option<String>,
    proxy_policy: ProxyPolicy,
    proxies: Option<Vec<InterfaceId>>,
}

impl Binding {
    pub fn builder(interface: InterfaceId, implementation: Arc<Implementation>) -> BindingBuilder {
        BindingBuilder {
            binding: Binding {
                interface,
                implementation,
                priority: 0,
                group: DEFAULT_GROUP,
                resource_policy: ResourcePolicy::None,
                resource_path: None,
                proxy_policy: ProxyPolicy::default(),
                proxies: None,
            },
        }
    }

    /// Bind `I` to `implementation`
    pub fn of<I: ?Sized + 'static>(implementation: Arc<Implementation>) -> BindingBuilder {
        Self::builder(InterfaceId::of::<I>(), implementation)
    }

    /// Bind the implementation under its own concrete type
    pub fn concrete(implementation: Arc<Implementation>) -> BindingBuilder {
        Self::builder(implementation.concrete(), implementation)
    }

    pub fn interface(&self) -> InterfaceId {
        self.interface
    }

    pub fn implementation(&self) -> &Arc<Implementation> {
        &self.implementation
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn group(&self) -> i32 {
        self.group
    }

    pub fn resource_policy(&self) -> ResourcePolicy {
        self.resource_policy
    }

    pub fn resource_path(&self) -> Option<&str> {
        self.resource_path.as_deref()
    }

    pub fn proxy_policy(&self) -> ProxyPolicy {
        self.proxy_policy
    }

    pub fn explicit_proxies(&self) -> Option<&[InterfaceId]> {
        self.proxies.as_deref()
    }

    /// Interfaces, other than the primary one, that resolve to this binding's instance
    pub fn proxy_interfaces(&self) -> Vec<InterfaceId> {
        let explicit = self.proxies.as_deref().unwrap_or_default();
        let mut selected: Vec<InterfaceId> = explicit.to_vec();

        let implementation = &self.implementation;
        match self.proxy_policy {
            ProxyPolicy::ExplicitListOnly => {}
            ProxyPolicy::DeclaredOnType => {
                selected.extend_from_slice(implementation.declared_interfaces());
            }
            ProxyPolicy::DeclaredOnTypeAndAncestors => {
                selected.extend_from_slice(implementation.declared_interfaces());
                selected.extend_from_slice(implementation.inherited_interfaces());
            }
            ProxyPolicy::DeclaredOnTypeIfNoExplicitProxies => {
                if explicit.is_empty() {
                    selected.extend_from_slice(implementation.declared_interfaces());
                }
            }
        }

        let mut unique = Vec::with_capacity(selected.len());
        for interface in selected {
            if interface != self.interface && !unique.contains(&interface) {
                unique.push(interface);
            }
        }
        unique
    }
}

pub struct BindingBuilder {
    binding: Binding,
}

impl BindingBuilder {
    /// Higher wins when several bindings target the same interface
    pub fn priority(mut self, priority: i32) -> Self {
        self.binding.priority = priority;
        self
    }

    pub fn group(mut self, group: i32) -> Self {
        self.binding.group = group;
        self
    }

    pub fn resource(mut self, policy: ResourcePolicy) -> Self {
        self.binding.resource_policy = policy;
        self
    }

    /// Replaces the default `<resource_root>/<InterfaceName>` lookup path
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.binding.resource_path = Some(path.into());
        self
    }

    pub fn proxy_policy(mut self, policy: ProxyPolicy) -> Self {
        self.binding.proxy_policy = policy;
        self
    }

    pub fn proxy(mut self, interface: InterfaceId) -> Self {
        self.binding.proxies.get_or_insert_with(Vec::new).push(interface);
        self
    }

    pub fn proxies(mut self, interfaces: impl IntoIterator<Item = InterfaceId>) -> Self {
        self.binding
            .proxies
            .get_or_insert_with(Vec::new)
            .extend(interfaces);
        self
    }

    /// # Errors
    /// `Configuration` when the implementation cannot be retrieved as the
    /// bound interface.
    pub fn build(self) -> Result<Binding> {
        ensure_supports(&self.binding.implementation, &self.binding.interface)?;
        Ok(self.binding)
    }
}
