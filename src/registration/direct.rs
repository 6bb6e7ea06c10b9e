use super::{DEFAULT_GROUP, RegistrationState, ServiceRegistration, ensure_supports};
use crate::binding::Implementation;
use crate::di::{AnyArc, Context, InterfaceId, ServiceInstance};
use crate::error::Result;
use std::any::Any;
use std::sync::Arc;

/// A registration for an instance that already exists
#[derive(Debug)]
pub struct DirectRegistration {
    interface: InterfaceId,
    group: i32,
    instance: ServiceInstance,
}

impl DirectRegistration {
    /// # Errors
    /// `Configuration` when the instance cannot be retrieved as `interface`.
    pub fn new(interface: InterfaceId, instance: ServiceInstance) -> Result<Self> {
        ensure_supports(instance.implementation(), &interface)?;
        Ok(Self {
            interface,
            group: DEFAULT_GROUP,
            instance,
        })
    }

    /// Register `object` under its concrete type. Init and shutdown hooks
    /// come from `implementation`.
    pub fn of<T: Any + Send + Sync>(object: Arc<T>, implementation: Arc<Implementation>) -> Result<Self> {
        let instance = ServiceInstance::new(object as AnyArc, implementation)?;
        Self::new(InterfaceId::of::<T>(), instance)
    }

    /// Register a shared handle under `I` with no lifecycle hooks
    pub fn shared<I: ?Sized + Send + Sync + 'static>(service: Arc<I>) -> Self {
        let implementation = Implementation::of::<Arc<I>>()
            .castable_as::<I, _>(|handle: Arc<Arc<I>>| Arc::clone(&*handle))
            .build();
        Self {
            interface: InterfaceId::of::<I>(),
            group: DEFAULT_GROUP,
            instance: ServiceInstance::from_parts(Arc::new(service), implementation),
        }
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }
}

impl ServiceRegistration for DirectRegistration {
    fn interface(&self) -> InterfaceId {
        self.interface
    }

    fn group(&self) -> i32 {
        self.group
    }

    fn state(&self) -> RegistrationState {
        RegistrationState::Instantiated
    }

    fn implementation(&self) -> Option<&Arc<Implementation>> {
        Some(self.instance.implementation())
    }

    fn get_service(&self, _context: &Context) -> Result<Option<ServiceInstance>> {
        Ok(Some(self.instance.clone()))
    }

    fn owned_instance(&self) -> Option<ServiceInstance> {
        Some(self.instance.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Registry;
    use crate::error::ServiceError;
    use crate::lifecycle::{InitService, LifecycleError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Score: Send + Sync {}

    #[derive(Default)]
    struct Board {
        inits: AtomicUsize,
    }

    impl InitService for Board {
        fn init_service(&self, _services: &Registry) -> std::result::Result<(), LifecycleError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_init_delegates_to_instance() {
        let implementation = Implementation::of::<Board>().sync_init().build();
        let board = Arc::new(Board::default());
        let registration = DirectRegistration::of(Arc::clone(&board), implementation).unwrap();

        let registry = Registry::new();
        let context = registry.active_context();
        registration.init_service(&context, &registry).await.unwrap();
        assert_eq!(board.inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejects_unsupported_interface() {
        let implementation = Implementation::of::<Board>().build();
        let instance = ServiceInstance::new(Arc::new(Board::default()), implementation).unwrap();
        let result = DirectRegistration::new(InterfaceId::of::<dyn Score>(), instance);
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }
}
