use serde::{Serialize, Serializer};
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a service interface.
///
/// Works for concrete types and trait objects alike (`InterfaceId::of::<dyn Api>()`).
/// Equality and hashing use the `TypeId`; ordering uses the type name compared
/// case-insensitively, which is what the loader sorts registrations by.
#[derive(Clone, Copy)]
pub struct InterfaceId {
    type_id: TypeId,
    name: &'static str,
}

impl InterfaceId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, e.g. `dyn my_game::audio::AudioApi`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment without `dyn` or generic arguments, e.g. `AudioApi`
    pub fn short_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for InterfaceId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for InterfaceId {}

impl Hash for InterfaceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl Ord for InterfaceId {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.type_id == other.type_id {
            return Ordering::Equal;
        }
        let left = self.name.chars().flat_map(char::to_lowercase);
        let right = other.name.chars().flat_map(char::to_lowercase);
        left.cmp(right)
            .then_with(|| self.name.cmp(other.name))
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl PartialOrd for InterfaceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({})", self.name)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for InterfaceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}
