use crate::di::{Inject, InterfaceId, ServiceInstance};
use crate::error::Result;
use crate::lifecycle::InjectionEvents;
use std::fmt;

type IsSetFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type AssignFn<T> = Box<dyn Fn(&T, &ServiceInstance) -> Result<bool> + Send + Sync>;

/// Types whose [`Inject`] members can be filled by the
/// [`DependencyInjector`](crate::di::DependencyInjector)
///
/// This trait is typically implemented via `#[derive(Injectable)]`.
///
/// # Example
/// ```rust,ignore
/// use loadout::{Inject, Injectable};
///
/// #[derive(Injectable)]
/// #[injectable(events)]
/// pub struct CounterDisplay {
///     counter: Inject<dyn CounterApi>,
///     label: String,
/// }
///
/// impl InjectionEvents for CounterDisplay {
///     fn on_did_inject(&self) {
///         tracing::info!("display wired");
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Every injectable member of the type, in declaration order
    fn injection_points() -> Vec<InjectionPoint<Self>>
    where
        Self: Sized;

    /// The target's event hooks, if it has any
    fn injection_events(&self) -> Option<&dyn InjectionEvents> {
        None
    }
}

/// One injectable member of `T`
pub struct InjectionPoint<T> {
    member: &'static str,
    interface: InterfaceId,
    is_set: IsSetFn<T>,
    assign: AssignFn<T>,
}

impl<T: 'static> InjectionPoint<T> {
    /// `slot` projects the target onto its member
    pub fn new<I>(member: &'static str, slot: fn(&T) -> &Inject<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            member,
            interface: InterfaceId::of::<I>(),
            is_set: Box::new(move |target| slot(target).is_set()),
            assign: Box::new(move |target, instance| {
                let service = instance.cast::<I>()?;
                Ok(slot(target).set_if_empty(service))
            }),
        }
    }

    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn interface(&self) -> InterfaceId {
        self.interface
    }

    pub fn is_set(&self, target: &T) -> bool {
        (self.is_set)(target)
    }

    /// Fill the member from `instance` unless it is already set
    pub fn assign(&self, target: &T, instance: &ServiceInstance) -> Result<bool> {
        (self.assign)(target, instance)
    }
}

impl<T> fmt::Debug for InjectionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("member", &self.member)
            .field("interface", &self.interface)
            .finish()
    }
}
