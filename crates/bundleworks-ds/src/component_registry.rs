//! Index of every component manager known to the runtime

use crate::config_admin::ConfigurationNotifier;
use crate::manager::ComponentManager;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Component managers keyed by `(bundle id, component name)`, plus the
/// configuration store their configurations read from
#[derive(Default)]
pub struct ComponentRegistry {
    managers: DashMap<(u64, String), Arc<ComponentManager>>,
    configuration_notifier: Arc<ConfigurationNotifier>,
}

impl ComponentRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a manager. Returns `false` if the bundle already has a component
    /// with the same name.
    pub fn add_component_manager(&self, manager: Arc<ComponentManager>) -> bool {
        let key = (manager.get_bundle_id(), manager.get_name().to_string());
        match self.managers.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(manager);
                true
            }
        }
    }

    pub fn remove_component_manager(
        &self,
        bundle_id: u64,
        name: &str,
    ) -> Option<Arc<ComponentManager>> {
        self.managers
            .remove(&(bundle_id, name.to_string()))
            .map(|(_, manager)| manager)
    }

    pub fn get_component_manager(&self, bundle_id: u64, name: &str) -> Option<Arc<ComponentManager>> {
        self.managers
            .get(&(bundle_id, name.to_string()))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Managers of one bundle, ordered by name
    pub fn get_component_managers_for(&self, bundle_id: u64) -> Vec<Arc<ComponentManager>> {
        let mut managers: Vec<_> = self
            .managers
            .iter()
            .filter(|entry| entry.key().0 == bundle_id)
            .map(|entry| (entry.key().1.clone(), Arc::clone(entry.value())))
            .collect();
        managers.sort_by(|a, b| a.0.cmp(&b.0));
        managers.into_iter().map(|(_, manager)| manager).collect()
    }

    /// Every manager, ordered by bundle id then name
    pub fn get_component_managers(&self) -> Vec<Arc<ComponentManager>> {
        let mut managers: Vec<_> = self
            .managers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        managers.sort_by(|a, b| a.0.cmp(&b.0));
        managers.into_iter().map(|(_, manager)| manager).collect()
    }

    pub fn configuration_notifier(&self) -> &Arc<ConfigurationNotifier> {
        &self.configuration_notifier
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("managers", &self.managers.len())
            .finish()
    }
}
