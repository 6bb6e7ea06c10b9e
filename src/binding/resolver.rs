use super::{Binding, ResourcePolicy};
use crate::di::InterfaceId;
use crate::error::{Result, ServiceError};
use crate::host::{HostContainer, HostScene, SharedInstantiator, SharedResourceLoader};
use crate::registration::{
    FactoryRegistration, HostedRegistration, ProxyRegistration, RegistrationSet,
    ResourceRegistration, ServiceRegistration,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns bindings and host scenes into registrations.
#[derive(Clone)]
pub struct BindingResolver {
    resource_root: String,
    resources: Option<SharedResourceLoader>,
    instantiator: Option<SharedInstantiator>,
}

impl BindingResolver {
    pub fn new(resource_root: impl Into<String>) -> Self {
        Self {
            resource_root: resource_root.into(),
            resources: None,
            instantiator: None,
        }
    }

    pub fn with_resources(mut self, resources: Option<SharedResourceLoader>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_instantiator(mut self, instantiator: Option<SharedInstantiator>) -> Self {
        self.instantiator = instantiator;
        self
    }

    /// Keep one binding per interface: the highest priority, or the first
    /// discovered among equals. Interfaces keep their discovery order.
    pub fn select_winners(bindings: Vec<Binding>) -> Vec<Binding> {
        let mut order: Vec<InterfaceId> = Vec::new();
        let mut by_interface: HashMap<InterfaceId, Vec<Binding>> = HashMap::new();
        for binding in bindings {
            let interface = binding.interface();
            by_interface
                .entry(interface)
                .or_insert_with(|| {
                    order.push(interface);
                    Vec::new()
                })
                .push(binding);
        }

        let mut winners = Vec::with_capacity(order.len());
        for interface in order {
            let Some(mut candidates) = by_interface.remove(&interface) else {
                continue;
            };
            // stable, so equal priorities keep discovery order
            candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));
            let mut candidates = candidates.into_iter();
            let Some(winner) = candidates.next() else {
                continue;
            };
            for loser in candidates {
                tracing::warn!(
                    "Multiple bindings for {}: using {} (priority {}), ignoring {} (priority {})",
                    interface,
                    winner.implementation().name(),
                    winner.priority(),
                    loser.implementation().name(),
                    loser.priority()
                );
            }
            winners.push(winner);
        }
        winners
    }

    /// The registration that owns the binding's instance
    pub fn primary_registration(&self, binding: &Binding) -> Result<Arc<dyn ServiceRegistration>> {
        let implementation = Arc::clone(binding.implementation());
        let registration: Arc<dyn ServiceRegistration> = match binding.resource_policy() {
            ResourcePolicy::None => Arc::new(
                FactoryRegistration::new(binding.interface(), implementation)?
                    .with_group(binding.group())
                    .with_instantiator(self.instantiator.clone()),
            ),
            policy => Arc::new(
                ResourceRegistration::new(
                    binding.interface(),
                    implementation,
                    policy,
                    &self.resource_root,
                    binding.resource_path(),
                )?
                .with_group(binding.group())
                .with_resources(self.resources.clone())
                .with_instantiator(self.instantiator.clone()),
            ),
        };
        Ok(registration)
    }

    /// One proxy per additional interface the binding exposes
    ///
    /// # Errors
    /// `Configuration` when the implementation cannot be retrieved as one of
    /// the proxy interfaces.
    pub fn proxy_registrations(&self, binding: &Binding) -> Result<Vec<Arc<dyn ServiceRegistration>>> {
        binding
            .proxy_interfaces()
            .into_iter()
            .map(|proxy| {
                if !binding.implementation().supports(&proxy) {
                    return Err(ServiceError::configuration(format!(
                        "{} cannot be proxied as {}: no cast registered",
                        binding.implementation().name(),
                        proxy
                    )));
                }
                Ok(Arc::new(
                    ProxyRegistration::new(proxy, binding.interface()).with_group(binding.group()),
                ) as Arc<dyn ServiceRegistration>)
            })
            .collect()
    }

    /// Resolve conflicting bindings and add the winners' registrations to `set`
    ///
    /// Primaries replace whatever `set` holds for their interface. Proxies
    /// only fill interfaces nothing else claimed; a proxy that collides with
    /// another registration is skipped with a warning.
    pub fn resolve_into(&self, bindings: Vec<Binding>, set: &mut RegistrationSet) -> Result<usize> {
        let winners = Self::select_winners(bindings);

        let mut proxies = Vec::new();
        for binding in &winners {
            set.set(self.primary_registration(binding)?);
            proxies.extend(self.proxy_registrations(binding)?);
        }

        let mut added = winners.len();
        for proxy in proxies {
            let interface = proxy.interface();
            if set.set_if_vacant(proxy) {
                added += 1;
            } else {
                tracing::warn!("Skipping proxy for {}: interface already registered", interface);
            }
        }
        Ok(added)
    }

    /// Register pre-existing host objects
    ///
    /// A container with its own registration uses it. Otherwise every object
    /// carrying service-interface markers is registered once per marker. An
    /// unmarked container holding exactly one non-structural object registers
    /// that object under its concrete type; any other container is skipped
    /// with a warning.
    pub fn resolve_scene(&self, scene: &HostScene, set: &mut RegistrationSet) -> Result<usize> {
        let mut added = 0;
        for container in scene.containers() {
            added += self.resolve_container(container, set)?;
        }
        Ok(added)
    }

    fn resolve_container(&self, container: &HostContainer, set: &mut RegistrationSet) -> Result<usize> {
        if let Some(registration) = container.registration() {
            set.set(Arc::clone(registration));
            return Ok(1);
        }

        let mut added = 0;
        let mut marked = false;
        for host_object in container.objects() {
            if host_object.markers().is_empty() {
                continue;
            }
            marked = true;
            let Some(object) = host_object.object() else {
                tracing::warn!(container = container.name(), "Skipping destroyed host object");
                continue;
            };
            for marker in host_object.markers() {
                let registration =
                    HostedRegistration::new(*marker, &object, Arc::clone(host_object.implementation()))?;
                set.set(Arc::new(registration));
                added += 1;
            }
        }
        if marked {
            return Ok(added);
        }

        let services: Vec<_> = container
            .objects()
            .iter()
            .filter(|host_object| !host_object.is_structural())
            .collect();
        let [service] = services.as_slice() else {
            tracing::warn!(
                container = container.name(),
                "Container has {} non-structural objects and no service markers; skipping it",
                services.len()
            );
            return Ok(0);
        };
        let Some(object) = service.object() else {
            tracing::warn!(container = container.name(), "Skipping destroyed host object");
            return Ok(0);
        };

        let implementation = Arc::clone(service.implementation());
        set.set(Arc::new(HostedRegistration::new(
            implementation.concrete(),
            &object,
            implementation,
        )?));
        Ok(1)
    }
}

impl std::fmt::Debug for BindingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingResolver")
            .field("resource_root", &self.resource_root)
            .field("resources", &self.resources.is_some())
            .field("instantiator", &self.instantiator.is_some())
            .finish()
    }
}
