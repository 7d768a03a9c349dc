//! Configuration data keyed by pid, and the components that depend on it

use bundleworks_core::{ComponentMetadata, ConfigurationPolicy, Properties};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationEventKind {
    Updated,
    Deleted,
}

/// Change to the configuration stored under one pid
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationEvent {
    pub pid: String,
    pub kind: ConfigurationEventKind,
    /// The new data, `None` once deleted
    pub properties: Option<Properties>,
}

pub type ConfigurationListener = Arc<dyn Fn(&ConfigurationEvent) + Send + Sync>;

/// Configuration store shared by every component of a runtime
///
/// Listeners subscribe per pid and are called on the thread making the
/// change, after the store has been updated and with no lock held.
#[derive(Default)]
pub struct ConfigurationNotifier {
    configurations: DashMap<String, Properties>,
    listeners: RwLock<HashMap<String, BTreeMap<u64, ConfigurationListener>>>,
    next_token: AtomicU64,
}

impl ConfigurationNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create or replace the configuration under `pid`
    pub fn update_configuration(&self, pid: &str, properties: Properties) {
        self.configurations
            .insert(pid.to_string(), properties.clone());
        tracing::debug!(pid, "Configuration updated");
        self.notify(ConfigurationEvent {
            pid: pid.to_string(),
            kind: ConfigurationEventKind::Updated,
            properties: Some(properties),
        });
    }

    /// Remove the configuration under `pid`; returns `false` if there was none
    pub fn delete_configuration(&self, pid: &str) -> bool {
        if self.configurations.remove(pid).is_none() {
            return false;
        }
        tracing::debug!(pid, "Configuration deleted");
        self.notify(ConfigurationEvent {
            pid: pid.to_string(),
            kind: ConfigurationEventKind::Deleted,
            properties: None,
        });
        true
    }

    pub fn get_configuration(&self, pid: &str) -> Option<Properties> {
        self.configurations
            .get(pid)
            .map(|entry| entry.value().clone())
    }

    pub fn register_listener(&self, pid: &str, listener: ConfigurationListener) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .entry(pid.to_string())
            .or_default()
            .insert(token, listener);
        token
    }

    pub fn unregister_listener(&self, pid: &str, token: u64) {
        let mut listeners = self.listeners.write();
        if let Some(for_pid) = listeners.get_mut(pid) {
            for_pid.remove(&token);
            if for_pid.is_empty() {
                listeners.remove(pid);
            }
        }
    }

    pub fn any_listeners_for_pid(&self, pid: &str) -> bool {
        self.listeners.read().contains_key(pid)
    }

    fn notify(&self, event: ConfigurationEvent) {
        let listeners: Vec<ConfigurationListener> = self
            .listeners
            .read()
            .get(&event.pid)
            .map(|for_pid| for_pid.values().cloned().collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for ConfigurationNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationNotifier")
            .field("configurations", &self.configurations.len())
            .field("pids_watched", &self.listeners.read().len())
            .finish()
    }
}

/// The configuration data one component configuration depends on
pub(crate) struct ConfigDependency {
    policy: ConfigurationPolicy,
    pids: Vec<String>,
    values: Mutex<BTreeMap<String, Properties>>,
}

impl ConfigDependency {
    /// `None` for components that ignore configuration data
    pub(crate) fn new(metadata: &ComponentMetadata) -> Option<Self> {
        if !metadata.uses_configuration() {
            return None;
        }
        Some(Self {
            policy: metadata.configuration_policy,
            pids: metadata.configuration_pids.clone(),
            values: Mutex::new(BTreeMap::new()),
        })
    }

    pub(crate) fn pids(&self) -> &[String] {
        &self.pids
    }

    /// Load whatever `notifier` already holds for our pids
    pub(crate) fn refresh(&self, notifier: &ConfigurationNotifier) {
        let mut values = self.values.lock();
        for pid in &self.pids {
            match notifier.get_configuration(pid) {
                Some(properties) => values.insert(pid.clone(), properties),
                None => values.remove(pid),
            };
        }
    }

    /// Record a change, returning satisfaction before and after it
    pub(crate) fn apply(&self, event: &ConfigurationEvent) -> (bool, bool) {
        let mut values = self.values.lock();
        let was_satisfied = self.satisfied_by(&values);
        match &event.properties {
            Some(properties) => {
                values.insert(event.pid.clone(), properties.clone());
            }
            None => {
                values.remove(&event.pid);
            }
        }
        (was_satisfied, self.satisfied_by(&values))
    }

    pub(crate) fn is_satisfied(&self) -> bool {
        self.satisfied_by(&self.values.lock())
    }

    fn satisfied_by(&self, values: &BTreeMap<String, Properties>) -> bool {
        match self.policy {
            ConfigurationPolicy::Require => self.pids.iter().all(|pid| values.contains_key(pid)),
            ConfigurationPolicy::Optional | ConfigurationPolicy::Ignore => true,
        }
    }

    /// Overlay configuration data on `properties`, later pids winning
    pub(crate) fn merge_into(&self, properties: &mut Properties) {
        let values = self.values.lock();
        for pid in &self.pids {
            if let Some(configured) = values.get(pid) {
                properties.extend(configured.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
    }
}
