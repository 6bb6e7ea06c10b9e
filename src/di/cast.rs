use crate::di::InterfaceId;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased shared object.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Turns the concrete object (an erased `Arc<Impl>`) into an erased `Arc<Interface>`.
/// The returned value is an `Arc<Arc<Interface>>` behind `dyn Any`.
type CasterFn = Arc<dyn Fn(AnyArc) -> Option<AnyArc> + Send + Sync>;

/// Every interface a concrete type can be viewed as, with the cast to reach it.
#[derive(Clone, Default)]
pub struct CastTable {
    casters: HashMap<InterfaceId, CasterFn>,
}

impl CastTable {
    /// A table that can view a `T` as itself.
    pub fn for_type<T: Any + Send + Sync>() -> Self {
        let mut table = Self::default();
        table.insert::<T, T, _>(|concrete| concrete);
        table
    }

    pub fn insert<Impl, Interface, F>(&mut self, caster_fn: F) -> &mut Self
    where
        Impl: Any + Send + Sync,
        Interface: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Interface> + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |instance: AnyArc| {
            let concrete = instance.downcast::<Impl>().ok()?;
            let interface_obj: Arc<Interface> = caster_fn(concrete);
            Some(Arc::new(interface_obj) as AnyArc)
        });
        self.casters.insert(InterfaceId::of::<Interface>(), caster);
        self
    }

    pub fn supports(&self, interface: &InterfaceId) -> bool {
        self.casters.contains_key(interface)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceId> {
        self.casters.keys()
    }

    /// Cast `object` to `interface`, returning the erased `Arc<Arc<Interface>>`.
    pub fn cast(&self, interface: &InterfaceId, object: &AnyArc) -> Option<AnyArc> {
        let caster = self.casters.get(interface)?;
        caster(object.clone())
    }

    /// Typed variant of [`CastTable::cast`].
    pub fn cast_to<Interface: ?Sized + 'static>(&self, object: &AnyArc) -> Option<Arc<Interface>> {
        let erased = self.cast(&InterfaceId::of::<Interface>(), object)?;
        let wrapper = erased.downcast_ref::<Arc<Interface>>()?;
        Some(wrapper.clone())
    }

    pub fn len(&self) -> usize {
        self.casters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_cast_to_trait_object() {
        let mut table = CastTable::for_type::<English>();
        table.insert::<English, dyn Greeter, _>(|e| e as Arc<dyn Greeter>);

        let object: AnyArc = Arc::new(English);
        let greeter = table.cast_to::<dyn Greeter>(&object).unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert!(table.cast_to::<English>(&object).is_some());
    }

    #[test]
    fn test_cast_of_wrong_object_fails() {
        let mut table = CastTable::for_type::<English>();
        table.insert::<English, dyn Greeter, _>(|e| e as Arc<dyn Greeter>);

        let other: AnyArc = Arc::new(42u32);
        assert!(table.cast_to::<dyn Greeter>(&other).is_none());
        assert!(!table.supports(&InterfaceId::of::<u32>()));
    }
}
