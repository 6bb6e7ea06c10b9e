use crate::di::status::StatusBroadcast;
use crate::di::{Context, InitStatus, InterfaceId, ServiceInstance, StatusObserver, SubscriptionId};
use crate::error::{Result, ServiceError};
use crate::registration::ServiceRegistration;
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// Handle to the set of service contexts and their readiness.
///
/// Cloning is cheap; every clone refers to the same contexts and status.
/// Exactly one context is active at a time and all lookups go through it.
/// Switching the active context never tears down the services held by the
/// previous one.
///
/// # Example
///
/// ```rust,ignore
/// let registry = Registry::new();
/// registry.wait_until_ready().await;
///
/// let audio = registry.require::<dyn AudioApi>()?;
/// registry.if_available::<dyn Analytics, _>(|analytics| analytics.track("boot"));
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    contexts: DashMap<String, Arc<Context>>,
    active: RwLock<Arc<Context>>,
    status: StatusBroadcast,
}

impl Registry {
    pub fn new() -> Self {
        let default = Arc::new(Context::new(""));
        let contexts = DashMap::new();
        contexts.insert(String::new(), Arc::clone(&default));
        Self {
            inner: Arc::new(RegistryInner {
                contexts,
                active: RwLock::new(default),
                status: StatusBroadcast::new(),
            }),
        }
    }

    // ---- contexts ----

    /// Context names are case-insensitive; the empty name is the default context
    pub fn context(&self, name: &str) -> Arc<Context> {
        let key = name.to_lowercase();
        Arc::clone(
            self.inner
                .contexts
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Context::new(key)))
                .value(),
        )
    }

    /// Make `name` the active context, creating it if needed
    pub fn set_active_context(&self, name: &str) -> Arc<Context> {
        let context = self.context(name);
        *self.inner.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&context);
        tracing::debug!(context = %context.name(), "Active service context changed");
        context
    }

    pub fn active_context(&self) -> Arc<Context> {
        Arc::clone(&self.inner.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn context_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.contexts.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    // ---- registration ----

    /// Insert `registration` into `context` and force its instance into existence
    ///
    /// # Errors
    /// `Configuration` when the registration cannot produce an instance.
    pub fn register_service_in(
        &self,
        context: &Context,
        registration: Arc<dyn ServiceRegistration>,
    ) -> Result<ServiceInstance> {
        let interface = registration.interface();
        context.set(interface, Arc::clone(&registration));
        registration.get_service(context)?.ok_or_else(|| {
            ServiceError::configuration(format!(
                "registration for {} produced no service instance",
                interface
            ))
        })
    }

    /// Register into the active context
    pub fn register_service(&self, registration: Arc<dyn ServiceRegistration>) -> Result<ServiceInstance> {
        self.register_service_in(&self.active_context(), registration)
    }

    /// Remove the registration for `interface` from the active context
    pub fn unregister_service(&self, interface: &InterfaceId) -> Result<bool> {
        let context = self.active_context();
        match context.get(interface) {
            Some(registration) => registration.unregister(&context),
            None => Ok(false),
        }
    }

    // ---- lookup ----

    pub fn locate(&self, interface: &InterfaceId) -> Result<Option<ServiceInstance>> {
        self.active_context().locate(interface)
    }

    /// The service registered for `I`, or `None` (with a warning) when missing
    pub fn get<I: ?Sized + 'static>(&self) -> Option<Arc<I>> {
        match self.require::<I>() {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!("Service lookup failed: {}", e);
                None
            }
        }
    }

    /// # Errors
    /// `DependencyNotFound` when nothing is registered for `I`.
    pub fn require<I: ?Sized + 'static>(&self) -> Result<Arc<I>> {
        let interface = InterfaceId::of::<I>();
        self.locate(&interface)?
            .ok_or_else(|| ServiceError::not_found(interface.name()))?
            .cast::<I>()
    }

    /// Run `f` only when a service for `I` is registered; returns whether it ran
    pub fn if_available<I, F>(&self, f: F) -> bool
    where
        I: ?Sized + 'static,
        F: FnOnce(Arc<I>),
    {
        if !self.is_registered::<I>() {
            return false;
        }
        match self.require::<I>() {
            Ok(service) => {
                f(service);
                true
            }
            Err(e) => {
                tracing::debug!("Service not available: {}", e);
                false
            }
        }
    }

    pub fn is_registered<I: ?Sized + 'static>(&self) -> bool {
        self.active_context().contains(&InterfaceId::of::<I>())
    }

    // ---- status ----

    pub fn status(&self) -> InitStatus {
        self.inner.status.current()
    }

    pub fn is_ready(&self) -> bool {
        self.status().ready
    }

    pub fn subscribe(&self, observer: StatusObserver) -> SubscriptionId {
        self.inner.status.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.status.unsubscribe(id)
    }

    pub fn watch_status(&self) -> watch::Receiver<InitStatus> {
        self.inner.status.watch()
    }

    /// Completes once the registry reports ready
    pub async fn wait_until_ready(&self) {
        let mut rx = self.watch_status();
        if rx.wait_for(|status| status.ready).await.is_err() {
            tracing::warn!("Status channel closed before services became ready");
        }
    }

    pub(crate) fn init_started(&self) {
        self.inner.status.set(InitStatus::LOADING);
    }

    pub(crate) fn init_complete(&self) {
        self.inner.status.set(InitStatus::READY);
    }

    pub(crate) fn init_aborted(&self) {
        self.inner.status.set(InitStatus::IDLE);
    }

    /// Clear every context and revert to not-ready.
    ///
    /// Registrations are dropped without their shutdown hooks; use
    /// [`ServiceLoader::unload_services`](crate::loader::ServiceLoader::unload_services)
    /// for an orderly teardown.
    pub fn shutdown_all(&self) {
        for entry in self.inner.contexts.iter() {
            entry.value().clear();
        }
        self.inner.status.set(InitStatus::IDLE);
        tracing::info!("All service contexts cleared");
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("active", &self.active_context().name())
            .field("status", &self.status())
            .finish()
    }
}
