use super::{ProxyRegistration, ServiceRegistration};
use crate::di::InterfaceId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// The registrations a loader has collected for one load cycle, keyed by interface
#[derive(Debug, Default)]
pub struct RegistrationSet {
    entries: HashMap<InterfaceId, Arc<dyn ServiceRegistration>>,
}

impl RegistrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any registration for the same interface
    pub fn set(&mut self, registration: Arc<dyn ServiceRegistration>) -> Option<Arc<dyn ServiceRegistration>> {
        self.entries.insert(registration.interface(), registration)
    }

    /// Insert unless the interface is already taken; returns whether it was inserted
    pub fn set_if_vacant(&mut self, registration: Arc<dyn ServiceRegistration>) -> bool {
        let interface = registration.interface();
        if self.entries.contains_key(&interface) {
            return false;
        }
        self.entries.insert(interface, registration);
        true
    }

    pub fn get(&self, interface: &InterfaceId) -> Option<&Arc<dyn ServiceRegistration>> {
        self.entries.get(interface)
    }

    pub fn remove(&mut self, interface: &InterfaceId) -> Option<Arc<dyn ServiceRegistration>> {
        self.entries.remove(interface)
    }

    pub fn contains(&self, interface: &InterfaceId) -> bool {
        self.entries.contains_key(interface)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registrations in load order
    ///
    /// A proxy whose target sits in a later group is moved into that group
    /// first, so it is always registered after the instance it forwards to.
    pub fn into_sorted(mut self) -> Vec<Arc<dyn ServiceRegistration>> {
        self.align_proxy_groups();
        let mut sorted: Vec<_> = self.entries.into_values().collect();
        sorted.sort_by(|a, b| compare_registrations(a.as_ref(), b.as_ref()));
        sorted
    }
}

impl RegistrationSet {
    fn align_proxy_groups(&mut self) {
        // one pass per link of a proxy-of-proxy chain
        for _ in 0..self.entries.len() {
            let lagging: Vec<_> = self
                .entries
                .values()
                .filter_map(|registration| {
                    let target = registration.proxy_target()?;
                    let group = self.entries.get(&target)?.group();
                    (group > registration.group()).then_some((registration.interface(), target, group))
                })
                .collect();
            if lagging.is_empty() {
                return;
            }

            for (interface, target, group) in lagging {
                tracing::debug!(service = %interface, group, "Moving proxy into the group of {}", target);
                self.entries.insert(
                    interface,
                    Arc::new(ProxyRegistration::new(interface, target).with_group(group)),
                );
            }
        }
    }
}

/// Load order: group ascending, primaries before proxies, then interface
/// name compared case-insensitively.
pub fn compare_registrations(a: &dyn ServiceRegistration, b: &dyn ServiceRegistration) -> Ordering {
    a.group()
        .cmp(&b.group())
        .then_with(|| a.is_proxy().cmp(&b.is_proxy()))
        .then_with(|| a.interface().cmp(&b.interface()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{DirectRegistration, ProxyRegistration};

    struct Zeta;
    struct Alpha;
    struct Late;

    fn direct<T: Send + Sync + 'static>(value: T, group: i32) -> Arc<dyn ServiceRegistration> {
        Arc::new(DirectRegistration::shared(Arc::new(value)).with_group(group))
    }

    #[test]
    fn test_sorted_by_group_then_proxy_then_name() {
        let mut set = RegistrationSet::new();
        set.set(direct(Late, 1));
        set.set(Arc::new(
            ProxyRegistration::new(InterfaceId::of::<u8>(), InterfaceId::of::<Zeta>()),
        ));
        set.set(direct(Zeta, 0));
        set.set(direct(Alpha, 0));

        let order: Vec<InterfaceId> = set.into_sorted().iter().map(|r| r.interface()).collect();
        assert_eq!(
            order,
            vec![
                InterfaceId::of::<Alpha>(),
                InterfaceId::of::<Zeta>(),
                InterfaceId::of::<u8>(),
                InterfaceId::of::<Late>(),
            ]
        );
    }

    #[test]
    fn test_proxy_follows_target_into_later_group() {
        let mut set = RegistrationSet::new();
        set.set(direct(Late, 2));
        set.set(Arc::new(
            ProxyRegistration::new(InterfaceId::of::<u8>(), InterfaceId::of::<Late>()).with_group(0),
        ));
        set.set(Arc::new(
            ProxyRegistration::new(InterfaceId::of::<u16>(), InterfaceId::of::<u8>()).with_group(0),
        ));
        set.set(direct(Alpha, 1));

        let sorted = set.into_sorted();
        let order: Vec<(InterfaceId, i32)> = sorted.iter().map(|r| (r.interface(), r.group())).collect();
        assert_eq!(
            order,
            vec![
                (InterfaceId::of::<Alpha>(), 1),
                (InterfaceId::of::<Late>(), 2),
                (InterfaceId::of::<u16>(), 2),
                (InterfaceId::of::<u8>(), 2),
            ]
        );
    }

    #[test]
    fn test_set_if_vacant_keeps_existing() {
        let mut set = RegistrationSet::new();
        assert!(set.set_if_vacant(direct(Alpha, 0)));
        assert!(!set.set_if_vacant(direct(Alpha, 3)));
        assert_eq!(set.get(&InterfaceId::of::<Alpha>()).unwrap().group(), 0);
        assert!(set.set(direct(Alpha, 3)).is_some());
        assert_eq!(set.len(), 1);
    }
}
