//! Service loading
//!
//! The [`ServiceLoader`] owns one load cycle:
//!
//! 1. collect registrations from discovered bindings, explicit
//!    registrations, the host scene and the post-registration hooks
//! 2. sort them by `(group, proxy, interface name)`
//! 3. register every one into the loader's context, creating its instance
//! 4. initialize them one at a time in the same order, waiting for each
//!    async initializer to finish before starting the next
//! 5. mark the registry ready

mod report;
mod state;

pub use report::{LoadOutcome, LoadReport, UnloadFailure, UnloadReport};
pub use state::LoaderState;

use crate::binding::{Binding, BindingResolver, BindingSource, Implementation, RegisterService};
use crate::config::LoaderConfig;
use crate::di::{AnyArc, Context, InterfaceId, Registry, ServiceInstance};
use crate::error::{Result, ServiceError};
use crate::host::{HostScene, SharedInstantiator, SharedResourceLoader};
use crate::registration::{
    DirectRegistration, ProxyRegistration, RegistrationSet, ServiceRegistration,
};
use chrono::Utc;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Runs after the registrations of a load cycle were collected and may add
/// or override registrations on the loader.
pub type RegistrationHook = Box<dyn Fn(&mut ServiceLoader) -> anyhow::Result<()> + Send + Sync>;

enum ExplicitEntry {
    Binding(Binding),
    Factory {
        implementation: Arc<Implementation>,
        group: i32,
        alias: Option<InterfaceId>,
    },
    Registration(Arc<dyn ServiceRegistration>),
}

impl ExplicitEntry {
    fn apply(&self, resolver: &BindingResolver, set: &mut RegistrationSet) -> Result<()> {
        match self {
            Self::Binding(binding) => {
                set.set(resolver.primary_registration(binding)?);
                for proxy in resolver.proxy_registrations(binding)? {
                    let interface = proxy.interface();
                    if !set.set_if_vacant(proxy) {
                        tracing::warn!("Skipping proxy for {}: interface already registered", interface);
                    }
                }
            }
            Self::Factory {
                implementation,
                group,
                alias,
            } => {
                let concrete = implementation.concrete();
                if alias.is_none() || !set.contains(&concrete) {
                    let binding = Binding::concrete(Arc::clone(implementation))
                        .group(*group)
                        .build()?;
                    set.set(resolver.primary_registration(&binding)?);
                }
                if let Some(alias) = alias {
                    set.set(Arc::new(ProxyRegistration::new(*alias, concrete).with_group(*group)));
                }
            }
            Self::Registration(registration) => {
                set.set(Arc::clone(registration));
            }
        }
        Ok(())
    }
}

/// Loads services into a [`Registry`]
///
/// # Example
///
/// ```rust,ignore
/// use loadout::prelude::*;
///
/// let registry = Registry::new();
/// let mut loader = ServiceLoader::builder(registry.clone())
///     .source(BindingCatalog::new().with::<AudioService>().with::<ScoreBoard>())
///     .config(LoaderConfig::from_env()?)
///     .build();
///
/// loader.register_instance::<dyn Clock>(Arc::new(SystemClock))?;
/// loader.load_services(false).await?;
///
/// let audio = registry.require::<dyn AudioApi>()?;
/// ```
pub struct ServiceLoader {
    registry: Registry,
    config: LoaderConfig,
    sources: Vec<Arc<dyn BindingSource>>,
    explicit: Vec<ExplicitEntry>,
    scene: Option<HostScene>,
    resources: Option<SharedResourceLoader>,
    instantiator: Option<SharedInstantiator>,
    hooks: Vec<RegistrationHook>,
    pending: RegistrationSet,
    assembling: bool,
    loaded: Vec<Arc<dyn ServiceRegistration>>,
    context: Option<Arc<Context>>,
    state: LoaderState,
    disposed: bool,
}

impl ServiceLoader {
    pub fn new(registry: Registry) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: Registry) -> ServiceLoaderBuilder {
        ServiceLoaderBuilder {
            loader: Self {
                registry,
                config: LoaderConfig::default(),
                sources: Vec::new(),
                explicit: Vec::new(),
                scene: None,
                resources: None,
                instantiator: None,
                hooks: Vec::new(),
                pending: RegistrationSet::new(),
                assembling: false,
                loaded: Vec::new(),
                context: None,
                state: LoaderState::Idle,
                disposed: false,
            },
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Interfaces registered by the last load, in load order
    pub fn loaded_interfaces(&self) -> Vec<InterfaceId> {
        self.loaded.iter().map(|r| r.interface()).collect()
    }

    /// True when the registrations collected so far include `I`
    pub fn is_registered<I: ?Sized + 'static>(&self) -> bool {
        self.pending.contains(&InterfaceId::of::<I>())
    }

    // ---- explicit registration ----

    /// Register `implementation` under its own type for lazy construction
    pub fn register_factory(&mut self, implementation: Arc<Implementation>, group: i32) -> Result<&mut Self> {
        self.add_explicit(ExplicitEntry::Factory {
            implementation,
            group,
            alias: None,
        })
    }

    /// Register `implementation` under its own type (unless already registered)
    /// and make it available as `I` through a proxy
    pub fn register_factory_as<I: ?Sized + 'static>(
        &mut self,
        implementation: Arc<Implementation>,
        group: i32,
    ) -> Result<&mut Self> {
        let alias = InterfaceId::of::<I>();
        if !implementation.supports(&alias) {
            return Err(ServiceError::configuration(format!(
                "registration interface {} must be implemented by {}",
                alias,
                implementation.name()
            )));
        }
        let alias = (alias != implementation.concrete()).then_some(alias);
        self.add_explicit(ExplicitEntry::Factory {
            implementation,
            group,
            alias,
        })
    }

    /// Register an already built service under `I`
    ///
    /// The handle carries no init or shutdown hooks; use
    /// [`register_instance_as`](Self::register_instance_as) for a service
    /// that has them.
    pub fn register_instance<I: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<I>) -> Result<&mut Self> {
        let registration = DirectRegistration::shared::<I>(service);
        self.add_explicit(ExplicitEntry::Registration(Arc::new(registration)))
    }

    /// Register an already built `object` under `I`, running the init and
    /// shutdown hooks of `implementation` for it
    pub fn register_instance_as<I, T>(&mut self, object: Arc<T>, implementation: Arc<Implementation>) -> Result<&mut Self>
    where
        I: ?Sized + 'static,
        T: Any + Send + Sync,
    {
        let instance = ServiceInstance::new(object as AnyArc, implementation)?;
        let registration = DirectRegistration::new(InterfaceId::of::<I>(), instance)?;
        self.add_explicit(ExplicitEntry::Registration(Arc::new(registration)))
    }

    /// Register an already built service under the interface and group of
    /// its own binding
    pub fn register_service_instance<T: RegisterService>(&mut self, service: Arc<T>) -> Result<&mut Self> {
        let binding = T::binding()?;
        let instance = ServiceInstance::new(service as AnyArc, T::implementation())?;
        let registration = DirectRegistration::new(binding.interface(), instance)?.with_group(binding.group());
        self.add_explicit(ExplicitEntry::Registration(Arc::new(registration)))
    }

    /// Register a binding ahead of anything discovered for the same interface
    pub fn register_binding(&mut self, binding: Binding) -> Result<&mut Self> {
        self.add_explicit(ExplicitEntry::Binding(binding))
    }

    /// Register a custom registration object
    pub fn register_registration(&mut self, registration: Arc<dyn ServiceRegistration>) -> Result<&mut Self> {
        self.add_explicit(ExplicitEntry::Registration(registration))
    }

    pub fn on_after_set_registrations<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ServiceLoader) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    fn add_explicit(&mut self, entry: ExplicitEntry) -> Result<&mut Self> {
        if self.disposed {
            return Err(ServiceError::LoaderDisposed);
        }
        if self.assembling {
            // inside a post-registration hook: applies to this cycle only
            entry.apply(&self.resolver(), &mut self.pending)?;
        } else {
            self.explicit.push(entry);
        }
        Ok(self)
    }

    fn resolver(&self) -> BindingResolver {
        BindingResolver::new(self.config.resource_root.clone())
            .with_resources(self.resources.clone())
            .with_instantiator(self.instantiator.clone())
    }

    // ---- load cycle ----

    /// Load, register and initialize every service
    ///
    /// Does nothing when services are already loaded and `force` is false.
    /// On failure the loader returns to `Idle` and the registry reports not
    /// ready; services registered before the failure stay registered until
    /// [`unload_services`](Self::unload_services).
    pub async fn load_services(&mut self, force: bool) -> Result<LoadOutcome> {
        match self.state {
            LoaderState::Unloaded => return Err(ServiceError::LoaderUnloaded),
            LoaderState::Ready if !force => {
                tracing::debug!("Services already loaded");
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            _ => {}
        }
        if self.disposed {
            return Err(ServiceError::LoaderDisposed);
        }

        tracing::info!("Loading services...");
        let started_at = Utc::now();
        self.registry.init_started();

        match self.run_load_cycle().await {
            Ok((context, init_order)) => {
                self.state = LoaderState::Ready;
                self.registry.init_complete();

                let report = LoadReport {
                    context,
                    init_order,
                    started_at,
                    finished_at: Utc::now(),
                };
                tracing::info!(
                    "Services loaded ({} registrations in {}ms)",
                    report.registered(),
                    report.elapsed().num_milliseconds()
                );

                if self.config.dispose_after_load {
                    self.dispose();
                }
                Ok(LoadOutcome::Loaded(report))
            }
            Err(e) => {
                tracing::error!(service = ?e.interface(), "Service load aborted: {}", e);
                self.state = LoaderState::Idle;
                self.registry.init_aborted();
                Err(e)
            }
        }
    }

    async fn run_load_cycle(&mut self) -> Result<(String, Vec<InterfaceId>)> {
        self.set_service_registrations()?;

        let sorted = std::mem::take(&mut self.pending).into_sorted();
        let context = self.registry.set_active_context(&self.config.default_context);
        self.context = Some(Arc::clone(&context));
        // a forced reload replaces the previous cycle's registrations
        self.loaded.clear();

        self.register_services(&sorted, &context)?;
        self.initialize_services(&sorted, &context).await?;

        let init_order = sorted.iter().map(|r| r.interface()).collect();
        Ok((context.name().to_string(), init_order))
    }

    /// Collect this cycle's registrations: discovered bindings, then explicit
    /// registrations, then the host scene, then the post-registration hooks.
    /// Later steps override earlier ones for the same interface.
    pub fn set_service_registrations(&mut self) -> Result<()> {
        let resolver = self.resolver();
        let mut pending = RegistrationSet::new();

        let mut bindings = Vec::new();
        for source in &self.sources {
            bindings.extend(source.bindings()?);
        }
        let discovered = resolver.resolve_into(bindings, &mut pending)?;

        for entry in &self.explicit {
            entry.apply(&resolver, &mut pending)?;
        }

        let from_scene = match &self.scene {
            Some(scene) => resolver.resolve_scene(scene, &mut pending)?,
            None => 0,
        };

        self.pending = pending;
        self.run_registration_hooks()?;

        tracing::debug!(
            discovered,
            explicit = self.explicit.len(),
            from_scene,
            total = self.pending.len(),
            "Service registrations set"
        );
        self.state = LoaderState::RegistrationsSet;
        Ok(())
    }

    fn run_registration_hooks(&mut self) -> Result<()> {
        let hooks = std::mem::take(&mut self.hooks);
        self.assembling = true;
        let result = hooks.iter().try_for_each(|hook| hook(self));
        self.assembling = false;

        let added = std::mem::replace(&mut self.hooks, hooks);
        self.hooks.extend(added);
        result.map_err(ServiceError::Hook)
    }

    fn register_services(&mut self, sorted: &[Arc<dyn ServiceRegistration>], context: &Context) -> Result<()> {
        for registration in sorted {
            self.registry
                .register_service_in(context, Arc::clone(registration))?;
            self.loaded.push(Arc::clone(registration));
            tracing::debug!(service = %registration.interface(), group = registration.group(), "Registered");
        }
        self.state = LoaderState::Registered;
        Ok(())
    }

    async fn initialize_services(
        &mut self,
        sorted: &[Arc<dyn ServiceRegistration>],
        context: &Context,
    ) -> Result<()> {
        self.state = LoaderState::Initializing;
        let timeout = self.config.init_timeout();

        for (index, registration) in sorted.iter().enumerate() {
            let interface = registration.interface();
            self.log_progress(format_args!(
                "Initializing service {}/{}: {} ({})",
                index + 1,
                sorted.len(),
                interface,
                registration.init_capability()
            ));

            let init = registration.init_service(context, &self.registry);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, init).await.map_err(|_| {
                    ServiceError::InitTimeout {
                        interface,
                        millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }
                })??,
                None => init.await?,
            }

            self.log_progress(format_args!("Service {} init complete", interface));
        }

        self.log_progress(format_args!("All {} services initialized", sorted.len()));
        Ok(())
    }

    fn log_progress(&self, message: fmt::Arguments<'_>) {
        if self.config.debug_load {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
    }

    /// Release the loader's inputs; registered services stay loaded
    pub fn dispose(&mut self) {
        self.sources.clear();
        self.explicit.clear();
        self.scene = None;
        self.resources = None;
        self.instantiator = None;
        self.hooks.clear();
        self.pending.clear();
        self.disposed = true;
        tracing::debug!("Service loader disposed");
    }

    /// Unregister every loaded service, in reverse load order
    ///
    /// Teardown failures are logged and collected; the remaining services
    /// are still unregistered. The loader cannot be used again afterwards.
    pub fn unload_services(&mut self) -> Result<UnloadReport> {
        if self.state.is_terminal() {
            return Err(ServiceError::LoaderUnloaded);
        }

        let context = self
            .context
            .take()
            .unwrap_or_else(|| self.registry.context(&self.config.default_context));

        tracing::info!("Unloading {} services...", self.loaded.len());
        let mut report = UnloadReport::default();
        for registration in self.loaded.drain(..).rev() {
            let interface = registration.interface();
            tracing::debug!(service = %interface, "Unregistering");
            match registration.unregister(&context) {
                Ok(true) => report.unregistered += 1,
                Ok(false) => tracing::debug!(service = %interface, "Already unregistered"),
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failures.push(UnloadFailure {
                        interface,
                        error: e.to_string(),
                    });
                }
            }
        }

        context.clear();
        self.registry.init_aborted();
        self.state = LoaderState::Unloaded;
        tracing::info!(
            "Services unloaded ({} unregistered, {} failures)",
            report.unregistered,
            report.failures.len()
        );
        Ok(report)
    }
}

impl fmt::Debug for ServiceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLoader")
            .field("state", &self.state)
            .field("sources", &self.sources.len())
            .field("explicit", &self.explicit.len())
            .field("loaded", &self.loaded.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Builder for [`ServiceLoader`]
pub struct ServiceLoaderBuilder {
    loader: ServiceLoader,
}

impl ServiceLoaderBuilder {
    /// Add a source of discovered bindings; sources are read in the order added
    pub fn source<S: BindingSource + 'static>(mut self, source: S) -> Self {
        self.loader.sources.push(Arc::new(source));
        self
    }

    pub fn scene(mut self, scene: HostScene) -> Self {
        self.loader.scene = Some(scene);
        self
    }

    pub fn resources(mut self, resources: SharedResourceLoader) -> Self {
        self.loader.resources = Some(resources);
        self
    }

    pub fn instantiator(mut self, instantiator: SharedInstantiator) -> Self {
        self.loader.instantiator = Some(instantiator);
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.loader.config = config;
        self
    }

    pub fn on_after_set_registrations<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ServiceLoader) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.loader.hooks.push(Box::new(hook));
        self
    }

    pub fn build(self) -> ServiceLoader {
        self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingCatalog;
    use crate::di::InitStatus;
    use std::sync::Mutex;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    #[derive(Default)]
    struct SystemClock;
    impl Clock for SystemClock {
        fn now(&self) -> u64 {
            1
        }
    }

    struct FrozenClock;
    impl Clock for FrozenClock {
        fn now(&self) -> u64 {
            0
        }
    }

    fn clock_binding() -> Binding {
        Binding::of::<dyn Clock>(
            Implementation::of::<SystemClock>()
                .default_constructible()
                .implements::<dyn Clock, _>(|c| c as Arc<dyn Clock>)
                .build(),
        )
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_twice_does_work_once() {
        let registry = Registry::new();
        let ready_events = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&ready_events);
        registry.subscribe(Arc::new(move |status: InitStatus| {
            if status.ready {
                *sink.lock().unwrap() += 1;
            }
        }));

        let mut loader = ServiceLoader::builder(registry.clone())
            .source(BindingCatalog::new().with_binding(clock_binding()))
            .build();

        let first = loader.load_services(false).await.unwrap();
        assert_eq!(first.report().unwrap().registered(), 1);
        assert!(matches!(loader.load_services(false).await.unwrap(), LoadOutcome::AlreadyLoaded));
        assert_eq!(*ready_events.lock().unwrap(), 1);
        assert_eq!(registry.require::<dyn Clock>().unwrap().now(), 1);

        loader.load_services(true).await.unwrap();
        assert_eq!(*ready_events.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_explicit_instance_overrides_discovered() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone())
            .source(BindingCatalog::new().with_binding(clock_binding()))
            .build();
        loader
            .register_instance::<dyn Clock>(Arc::new(FrozenClock))
            .unwrap();

        loader.load_services(false).await.unwrap();
        assert_eq!(registry.require::<dyn Clock>().unwrap().now(), 0);
    }

    #[tokio::test]
    async fn test_hook_sees_and_overrides_registrations() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone())
            .source(BindingCatalog::new().with_binding(clock_binding()))
            .on_after_set_registrations(|loader| {
                anyhow::ensure!(loader.is_registered::<dyn Clock>(), "clock missing");
                loader.register_instance::<dyn Clock>(Arc::new(FrozenClock))?;
                Ok(())
            })
            .build();

        loader.load_services(false).await.unwrap();
        assert_eq!(registry.require::<dyn Clock>().unwrap().now(), 0);
    }

    #[tokio::test]
    async fn test_failing_hook_aborts_load() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone())
            .on_after_set_registrations(|_| Err(anyhow::anyhow!("no network")))
            .build();

        let result = loader.load_services(false).await;
        assert!(matches!(result, Err(ServiceError::Hook(_))));
        assert_eq!(loader.state(), LoaderState::Idle);
        assert_eq!(registry.status(), InitStatus::IDLE);
    }

    #[tokio::test]
    async fn test_missing_constructor_aborts_load() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::new(registry.clone());
        loader
            .register_factory(Implementation::of::<FrozenClock>().build(), 0)
            .unwrap();

        let result = loader.load_services(false).await;
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
        assert!(!registry.is_ready());
    }

    #[tokio::test]
    async fn test_unload_is_terminal() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone())
            .source(BindingCatalog::new().with_binding(clock_binding()))
            .build();
        loader.load_services(false).await.unwrap();

        let report = loader.unload_services().unwrap();
        assert_eq!(report.unregistered, 1);
        assert!(!registry.is_registered::<dyn Clock>());
        assert!(!registry.is_ready());
        assert_eq!(loader.state(), LoaderState::Unloaded);

        assert!(matches!(loader.load_services(true).await, Err(ServiceError::LoaderUnloaded)));
        assert!(matches!(loader.unload_services(), Err(ServiceError::LoaderUnloaded)));
    }

    #[tokio::test]
    async fn test_dispose_after_load() {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone())
            .source(BindingCatalog::new().with_binding(clock_binding()))
            .config(LoaderConfig {
                dispose_after_load: true,
                ..LoaderConfig::default()
            })
            .build();

        loader.load_services(false).await.unwrap();
        assert!(loader.is_disposed());
        assert!(registry.is_registered::<dyn Clock>());
        assert!(matches!(loader.load_services(true).await, Err(ServiceError::LoaderDisposed)));
        assert!(loader.unload_services().is_ok());
    }
}
