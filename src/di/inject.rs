use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A member slot filled by the [`DependencyInjector`](crate::di::DependencyInjector).
///
/// Once a slot holds a value it is never overwritten by injection.
pub struct Inject<T: ?Sized> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Inject<T> {
    pub const fn empty() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// A slot preset to `value`
    pub fn with(value: Arc<T>) -> Self {
        Self {
            slot: RwLock::new(Some(value)),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Store `value` unless the slot is already filled; returns whether it was stored
    pub fn set_if_empty(&self, value: Arc<T>) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }
}

impl<T: ?Sized> Default for Inject<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &std::any::type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}
