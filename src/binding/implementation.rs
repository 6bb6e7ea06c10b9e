use crate::di::{AnyArc, CastTable, InterfaceId};
use crate::lifecycle::{
    AsyncInitService, InitCapability, InitService, Initializer, ShutdownHook, ShutdownService,
};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type ConstructorFn = Arc<dyn Fn() -> AnyArc + Send + Sync>;

/// How a [`FactoryRegistration`](crate::registration::FactoryRegistration) obtains a new instance.
#[derive(Clone)]
pub enum Constructor {
    /// Never constructed here; the object comes from the host or a resource.
    None,
    /// A no-argument constructor.
    Default(ConstructorFn),
    /// Created by the [`HostInstantiator`](crate::host::HostInstantiator).
    HostManaged,
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Default(_) => f.write_str("Default"),
            Self::HostManaged => f.write_str("HostManaged"),
        }
    }
}

/// Static description of a concrete service type.
///
/// Holds everything the registry needs to know about the type without
/// reflection: how to build it, which interfaces it can be retrieved as and
/// which lifecycle hooks it supports.
pub struct Implementation {
    concrete: InterfaceId,
    constructor: Constructor,
    casts: CastTable,
    declared: Vec<InterfaceId>,
    inherited: Vec<InterfaceId>,
    initializer: Initializer,
    shutdown: Option<ShutdownHook>,
}

impl Implementation {
    pub fn of<T: Any + Send + Sync>() -> ImplementationBuilder<T> {
        ImplementationBuilder::new()
    }

    /// The implementation type's own identity
    pub fn concrete(&self) -> InterfaceId {
        self.concrete
    }

    pub fn name(&self) -> &'static str {
        self.concrete.name()
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    /// True when an instance can be retrieved as `interface`
    pub fn supports(&self, interface: &InterfaceId) -> bool {
        self.casts.supports(interface)
    }

    /// Interfaces declared directly on the type
    pub fn declared_interfaces(&self) -> &[InterfaceId] {
        &self.declared
    }

    /// Interfaces the type picks up from the types it builds on
    pub fn inherited_interfaces(&self) -> &[InterfaceId] {
        &self.inherited
    }

    pub fn capability(&self) -> InitCapability {
        self.initializer.capability()
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    pub fn shutdown_hook(&self) -> Option<&ShutdownHook> {
        self.shutdown.as_ref()
    }

    /// True when `object` is an instance of this implementation
    pub fn accepts(&self, object: &AnyArc) -> bool {
        Any::type_id(object.as_ref()) == self.concrete.type_id()
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("type", &self.concrete.name())
            .field("constructor", &self.constructor)
            .field("declared", &self.declared)
            .field("inherited", &self.inherited)
            .field("init", &self.initializer.capability())
            .finish()
    }
}

/// Builder for [`Implementation`]
///
/// # Example
/// ```rust,ignore
/// let implementation = Implementation::of::<AudioService>()
///     .default_constructible()
///     .implements::<dyn AudioApi, _>(|s| s)
///     .sync_init()
///     .build();
/// ```
pub struct ImplementationBuilder<T> {
    constructor: Constructor,
    casts: CastTable,
    declared: Vec<InterfaceId>,
    inherited: Vec<InterfaceId>,
    initializer: Initializer,
    shutdown: Option<ShutdownHook>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ImplementationBuilder<T> {
    fn new() -> Self {
        Self {
            constructor: Constructor::None,
            casts: CastTable::for_type::<T>(),
            declared: Vec::new(),
            inherited: Vec::new(),
            initializer: Initializer::None,
            shutdown: None,
            _marker: PhantomData,
        }
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor = Constructor::Default(Arc::new(move || Arc::new(constructor()) as AnyArc));
        self
    }

    pub fn default_constructible(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Instances are created by the host instantiation collaborator
    pub fn host_managed(mut self) -> Self {
        self.constructor = Constructor::HostManaged;
        self
    }

    /// Declare an interface implemented directly by `T`
    pub fn implements<I, F>(mut self, caster: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.casts.insert::<T, I, F>(caster);
        push_unique(&mut self.declared, InterfaceId::of::<I>());
        self
    }

    /// Declare an interface `T` gets from a type it builds on
    pub fn inherits<I, F>(mut self, caster: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.casts.insert::<T, I, F>(caster);
        push_unique(&mut self.inherited, InterfaceId::of::<I>());
        self
    }

    /// Allow retrieval as `I` without declaring it; only reachable through
    /// an explicit binding or proxy list.
    pub fn castable_as<I, F>(mut self, caster: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.casts.insert::<T, I, F>(caster);
        self
    }

    pub fn sync_init(mut self) -> Self
    where
        T: InitService,
    {
        self.initializer = Initializer::sync::<T>();
        self
    }

    pub fn async_init(mut self) -> Self
    where
        T: AsyncInitService,
    {
        self.initializer = Initializer::from_async::<T>();
        self
    }

    pub fn shutdown_hook(mut self) -> Self
    where
        T: ShutdownService,
    {
        self.shutdown = Some(ShutdownHook::of::<T>());
        self
    }

    pub fn build(self) -> Arc<Implementation> {
        Arc::new(Implementation {
            concrete: InterfaceId::of::<T>(),
            constructor: self.constructor,
            casts: self.casts,
            declared: self.declared,
            inherited: self.inherited,
            initializer: self.initializer,
            shutdown: self.shutdown,
        })
    }
}

fn push_unique(list: &mut Vec<InterfaceId>, interface: InterfaceId) {
    if !list.contains(&interface) {
        list.push(interface);
    }
}
