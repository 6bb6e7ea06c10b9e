use crate::di::{AnyArc, InjectionPoint, Injectable, Registry, SubscriptionId};
use dashmap::DashMap;
use serde::Serialize;
use std::any::TypeId;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

/// Result of one injection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InjectionOutcome {
    /// Members were resolved against the active context
    Injected {
        injected: usize,
        skipped: usize,
        missing: Vec<&'static str>,
    },
    /// Services were not ready; the target was queued and will be retried
    Deferred,
}

struct PendingInjection {
    type_name: &'static str,
    retry: Box<dyn Fn(&DependencyInjector) -> bool + Send>,
}

struct InjectorInner {
    registry: Registry,
    points: DashMap<TypeId, AnyArc>,
    pending: Mutex<Vec<PendingInjection>>,
    subscription: OnceLock<SubscriptionId>,
}

impl Drop for InjectorInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get() {
            self.registry.unsubscribe(*id);
        }
    }
}

/// Fills the [`Inject`](crate::di::Inject) members of objects from a [`Registry`].
///
/// When services are not ready yet the target is queued (weakly) and
/// injected automatically once the registry reports ready.
#[derive(Clone)]
pub struct DependencyInjector {
    inner: Arc<InjectorInner>,
}

impl DependencyInjector {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                registry,
                points: DashMap::new(),
                pending: Mutex::new(Vec::new()),
                subscription: OnceLock::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Number of targets waiting for services to become ready
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn inject_dependencies<T: Injectable>(&self, target: &Arc<T>) -> InjectionOutcome {
        let points = self.points_for::<T>();
        let events = target.injection_events();
        let registry = &self.inner.registry;

        let mut injected = 0;
        let mut skipped = 0;
        let mut missing = Vec::new();
        let mut will_inject_sent = false;

        for point in points.iter() {
            if point.is_set(target) {
                skipped += 1;
                continue;
            }

            if !registry.is_ready() {
                if let Some(events) = events {
                    events.on_waiting_for_services();
                }
                self.enqueue(target);
                return InjectionOutcome::Deferred;
            }

            if !will_inject_sent {
                if let Some(events) = events {
                    events.on_will_inject();
                }
                will_inject_sent = true;
            }

            match registry.locate(&point.interface()) {
                Ok(Some(instance)) => match point.assign(target, &instance) {
                    Ok(true) => injected += 1,
                    Ok(false) => skipped += 1,
                    Err(e) => {
                        tracing::warn!(member = point.member(), "Injection into {} failed: {}", std::any::type_name::<T>(), e);
                        missing.push(point.member());
                    }
                },
                Ok(None) => {
                    tracing::warn!(
                        "Service not registered for type {} marked for injection by {}",
                        point.interface(),
                        std::any::type_name::<T>()
                    );
                    missing.push(point.member());
                }
                Err(e) => {
                    tracing::warn!(member = point.member(), "Service lookup failed: {}", e);
                    missing.push(point.member());
                }
            }
        }

        if let Some(events) = events {
            events.on_did_inject();
        }

        InjectionOutcome::Injected {
            injected,
            skipped,
            missing,
        }
    }

    fn points_for<T: Injectable>(&self) -> Arc<Vec<InjectionPoint<T>>> {
        let type_id = TypeId::of::<T>();
        let cached = self
            .inner
            .points
            .get(&type_id)
            .and_then(|entry| Arc::clone(entry.value()).downcast::<Vec<InjectionPoint<T>>>().ok());
        if let Some(points) = cached {
            return points;
        }

        let points = Arc::new(T::injection_points());
        self.inner
            .points
            .insert(type_id, Arc::clone(&points) as AnyArc);
        points
    }

    fn enqueue<T: Injectable>(&self, target: &Arc<T>) {
        self.ensure_subscribed();

        let weak: Weak<T> = Arc::downgrade(target);
        let entry = PendingInjection {
            type_name: std::any::type_name::<T>(),
            retry: Box::new(move |injector| match weak.upgrade() {
                Some(target) => {
                    injector.inject_dependencies(&target);
                    true
                }
                None => false,
            }),
        };
        tracing::debug!(target_type = entry.type_name, "Injection deferred until services are ready");
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn ensure_subscribed(&self) {
        self.inner.subscription.get_or_init(|| {
            let weak = Arc::downgrade(&self.inner);
            self.inner.registry.subscribe(Arc::new(move |status| {
                if !status.ready {
                    return;
                }
                if let Some(inner) = weak.upgrade() {
                    DependencyInjector { inner }.drain_pending();
                }
            }))
        });
    }

    /// Retry every queued target in enqueue order
    fn drain_pending(&self) {
        let pending = std::mem::take(
            &mut *self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return;
        }

        tracing::debug!(count = pending.len(), "Running deferred injections");
        for entry in pending {
            if !(entry.retry)(self) {
                tracing::debug!(target_type = entry.type_name, "Deferred injection target dropped");
            }
        }
    }
}

impl std::fmt::Debug for DependencyInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInjector")
            .field("pending", &self.pending_count())
            .finish()
    }
}
