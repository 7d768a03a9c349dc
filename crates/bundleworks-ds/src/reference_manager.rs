//! Tracking of one declared service dependency

use bundleworks_core::properties::{COMPONENT_NAME, SERVICE_SCOPE, string_property};
use bundleworks_core::{
    FrameworkResult, LogLevel, ReferenceMetadata, ReferencePolicy, ReferencePolicyOption,
    ReferenceScope,
};
use bundleworks_framework::{
    BundleContext, LdapFilter, ServiceEvent, ServiceEventKind, ServiceReference,
};
use bundleworks_logging::Logger;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// What changed about a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefEvent {
    BecameSatisfied,
    BecameUnsatisfied,
    /// A dynamic reference swapped bound services without losing satisfaction
    Rebind {
        bind: Option<ServiceReference>,
        unbind: Option<ServiceReference>,
    },
}

/// Notification delivered to [`ReferenceManager`] listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefChangeNotification {
    pub reference_name: String,
    pub event: RefEvent,
}

pub type RefChangeListener = Arc<dyn Fn(&RefChangeNotification) + Send + Sync>;

static NEXT_LISTENER_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Tracked {
    /// Every live service matching interface and target, best first
    matched: BTreeSet<ServiceReference>,
    /// The subset selected by the binding policy
    bound: BTreeSet<ServiceReference>,
}

impl Tracked {
    fn remove_matched(&mut self, id: u64) -> Option<ServiceReference> {
        let found = self.matched.iter().find(|r| r.id() == id).cloned()?;
        self.matched.remove(&found);
        Some(found)
    }

    fn remove_bound(&mut self, id: u64) -> Option<ServiceReference> {
        let found = self.bound.iter().find(|r| r.id() == id).cloned()?;
        self.bound.remove(&found);
        Some(found)
    }

    fn is_bound(&self, id: u64) -> bool {
        self.bound.iter().any(|r| r.id() == id)
    }

    /// Best matched reference that is not bound
    fn best_unbound(&self) -> Option<ServiceReference> {
        self.matched
            .iter()
            .find(|r| !self.is_bound(r.id()))
            .cloned()
    }
}

/// Tracks the services satisfying one reference of a component configuration
///
/// Reacts to service registry events, applies cardinality and binding policy,
/// and tells listeners when the reference becomes satisfied or unsatisfied.
/// Notifications are delivered on the thread that made the registry change,
/// after the manager's own lock has been released.
pub struct ReferenceManager {
    metadata: ReferenceMetadata,
    component_name: String,
    filter: LdapFilter,
    context: BundleContext,
    logger: Arc<dyn Logger>,
    tracked: Mutex<Tracked>,
    listeners: RwLock<BTreeMap<u64, RefChangeListener>>,
    registry_token: Mutex<Option<u64>>,
}

impl ReferenceManager {
    /// Create a manager and start tracking matching services
    ///
    /// # Errors
    ///
    /// [`bundleworks_core::FrameworkError::InvalidFilter`] when the reference's
    /// target filter cannot be parsed.
    pub fn new(
        metadata: ReferenceMetadata,
        context: BundleContext,
        logger: Arc<dyn Logger>,
        component_name: impl Into<String>,
    ) -> FrameworkResult<Arc<Self>> {
        let filter = LdapFilter::parse(&Self::target_filter(&metadata))?;
        let manager = Arc::new(Self {
            metadata,
            component_name: component_name.into(),
            filter,
            context,
            logger,
            tracked: Mutex::new(Tracked::default()),
            listeners: RwLock::new(BTreeMap::new()),
            registry_token: Mutex::new(None),
        });
        manager.start_tracking();
        Ok(manager)
    }

    /// `(&(objectclass=<interface>)<target>)`, plus a prototype scope clause
    /// for `prototype-required` references
    fn target_filter(metadata: &ReferenceMetadata) -> String {
        let mut filter = format!(
            "(&({}={})",
            bundleworks_core::properties::OBJECTCLASS,
            metadata.interface
        );
        if let Some(target) = metadata.target.as_deref().filter(|t| !t.is_empty()) {
            filter.push_str(target);
        }
        if metadata.scope == ReferenceScope::PrototypeRequired {
            filter.push_str(&format!("({SERVICE_SCOPE}=prototype)"));
        }
        filter.push(')');
        filter
    }

    fn start_tracking(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let registry = self.context.registry();

        let mut tracked = self.tracked.lock();
        let token = registry.add_listener(
            Some(self.filter.clone()),
            Arc::new(move |event: &ServiceEvent| {
                if let Some(manager) = weak.upgrade() {
                    manager.service_changed(event);
                }
            }),
        );
        *self.registry_token.lock() = Some(token);

        let mut ignored = Vec::new();
        for reference in registry.find(&self.metadata.interface, Some(&self.filter)) {
            if self.is_own_service(&reference) || tracked.matched.contains(&reference) {
                continue;
            }
            tracked.matched.insert(reference.clone());
            self.service_added(&mut tracked, reference, &mut ignored);
        }
        self.logger.log(
            LogLevel::Debug,
            &format!(
                "Reference '{}' of component '{}' started tracking {} service(s)",
                self.metadata.name,
                self.component_name,
                tracked.matched.len()
            ),
        );
    }

    /// Stop listening to the service registry. Idempotent.
    pub fn stop_tracking(&self) {
        if let Some(token) = self.registry_token.lock().take() {
            self.context.registry().remove_listener(token);
        }
    }

    pub fn get_reference_name(&self) -> &str {
        &self.metadata.name
    }

    pub fn get_metadata(&self) -> &ReferenceMetadata {
        &self.metadata
    }

    /// The filter services are matched against
    pub fn get_ldap_string(&self) -> String {
        self.filter.to_string()
    }

    /// Whether enough services are bound to meet the minimum cardinality
    pub fn is_satisfied(&self) -> bool {
        self.tracked.lock().bound.len() >= self.metadata.cardinality.min()
    }

    pub fn is_optional(&self) -> bool {
        self.metadata.cardinality.is_optional()
    }

    /// Bound references, best first
    pub fn get_bound_references(&self) -> Vec<ServiceReference> {
        self.tracked.lock().bound.iter().cloned().collect()
    }

    /// Every live matching reference, best first
    pub fn get_target_references(&self) -> Vec<ServiceReference> {
        self.tracked.lock().matched.iter().cloned().collect()
    }

    /// Subscribe to satisfaction changes
    ///
    /// If the reference can already be satisfied the new listener is told so
    /// straight away.
    pub fn register_listener(&self, listener: RefChangeListener) -> u64 {
        let token = NEXT_LISTENER_TOKEN.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().insert(token, Arc::clone(&listener));

        let satisfied = {
            let mut tracked = self.tracked.lock();
            self.update_bound_refs(&mut tracked)
        };
        if satisfied {
            listener(&self.notification(RefEvent::BecameSatisfied));
        }
        token
    }

    pub fn unregister_listener(&self, token: u64) -> bool {
        self.listeners.write().remove(&token).is_some()
    }

    fn service_changed(&self, event: &ServiceEvent) {
        let reference = &event.reference;
        if self.is_own_service(reference) {
            return;
        }

        let mut notifications = Vec::new();
        {
            let mut tracked = self.tracked.lock();
            match event.kind {
                ServiceEventKind::Registered => {
                    // withdrawn by a listener that heard of it before us
                    if !self.context.registry().is_registered(reference.id()) {
                        return;
                    }
                    if tracked.matched.iter().all(|r| r.id() != reference.id()) {
                        tracked.matched.insert(reference.clone());
                        self.service_added(&mut tracked, reference.clone(), &mut notifications);
                    }
                }
                ServiceEventKind::Unregistering => {
                    self.service_removed(&mut tracked, reference.id(), &mut notifications);
                }
                ServiceEventKind::Modified => {
                    let was_matched = tracked.remove_matched(reference.id()).is_some();
                    let now_matches = self.filter.matches(reference.properties());
                    match (was_matched, now_matches) {
                        (false, true) => {
                            tracked.matched.insert(reference.clone());
                            self.service_added(&mut tracked, reference.clone(), &mut notifications);
                        }
                        (true, false) => {
                            tracked.matched.insert(reference.clone());
                            self.service_removed(&mut tracked, reference.id(), &mut notifications);
                        }
                        (true, true) => {
                            tracked.matched.insert(reference.clone());
                            if tracked.remove_bound(reference.id()).is_some() {
                                tracked.bound.insert(reference.clone());
                            } else {
                                self.service_added(&mut tracked, reference.clone(), &mut notifications);
                            }
                        }
                        (false, false) => {}
                    }
                }
            }
        }
        self.notify_all(notifications);
    }

    /// `reference` has just been inserted into `matched`
    fn service_added(
        &self,
        tracked: &mut Tracked,
        reference: ServiceReference,
        notifications: &mut Vec<RefEvent>,
    ) {
        let min = self.metadata.cardinality.min();
        let max = self.metadata.cardinality.max();

        if tracked.bound.len() < min {
            if self.update_bound_refs(tracked) {
                notifications.push(RefEvent::BecameSatisfied);
            }
            return;
        }

        match self.metadata.policy {
            ReferencePolicy::Static => {
                if self.metadata.policy_option != ReferencePolicyOption::Greedy
                    || tracked.is_bound(reference.id())
                {
                    return;
                }
                let replace = match tracked.bound.iter().next_back() {
                    Some(worst) => reference.is_better_than(worst),
                    None => self.is_optional(),
                };
                if replace {
                    // static references rebind by going through unsatisfied
                    notifications.push(RefEvent::BecameUnsatisfied);
                    tracked.bound.clear();
                    if self.update_bound_refs(tracked) {
                        notifications.push(RefEvent::BecameSatisfied);
                    }
                }
            }
            ReferencePolicy::Dynamic => {
                if tracked.is_bound(reference.id()) {
                    return;
                }
                if tracked.bound.len() < max {
                    tracked.bound.insert(reference.clone());
                    notifications.push(RefEvent::Rebind {
                        bind: Some(reference),
                        unbind: None,
                    });
                    return;
                }
                if self.metadata.policy_option == ReferencePolicyOption::Greedy
                    && !self.metadata.cardinality.is_multiple()
                    && let Some(current) = tracked.bound.iter().next_back().cloned()
                    && reference.is_better_than(&current)
                {
                    tracked.bound.remove(&current);
                    tracked.bound.insert(reference.clone());
                    notifications.push(RefEvent::Rebind {
                        bind: Some(reference),
                        unbind: Some(current),
                    });
                }
            }
        }
    }

    fn service_removed(&self, tracked: &mut Tracked, id: u64, notifications: &mut Vec<RefEvent>) {
        if tracked.remove_matched(id).is_none() {
            return;
        }
        let Some(removed) = tracked.remove_bound(id) else {
            return;
        };

        match self.metadata.policy {
            ReferencePolicy::Static => {
                notifications.push(RefEvent::BecameUnsatisfied);
                tracked.bound.clear();
                if self.update_bound_refs(tracked) {
                    notifications.push(RefEvent::BecameSatisfied);
                }
            }
            ReferencePolicy::Dynamic => {
                if let Some(replacement) = tracked.best_unbound() {
                    tracked.bound.insert(replacement.clone());
                    notifications.push(RefEvent::Rebind {
                        bind: Some(replacement),
                        unbind: Some(removed),
                    });
                } else if tracked.bound.len() >= self.metadata.cardinality.min() {
                    notifications.push(RefEvent::Rebind {
                        bind: None,
                        unbind: Some(removed),
                    });
                } else {
                    tracked.bound.clear();
                    notifications.push(RefEvent::BecameUnsatisfied);
                }
            }
        }
    }

    /// Bind the best matches, up to the maximum cardinality
    ///
    /// Returns whether enough services match to satisfy the reference.
    fn update_bound_refs(&self, tracked: &mut Tracked) -> bool {
        if tracked.matched.len() < self.metadata.cardinality.min() {
            return false;
        }
        let max = self.metadata.cardinality.max();
        let candidates: Vec<ServiceReference> = tracked.matched.iter().cloned().collect();
        for candidate in candidates {
            if tracked.bound.len() >= max {
                break;
            }
            if !tracked.is_bound(candidate.id()) {
                tracked.bound.insert(candidate);
            }
        }
        true
    }

    fn is_own_service(&self, reference: &ServiceReference) -> bool {
        string_property(reference.properties(), COMPONENT_NAME)
            .is_some_and(|name| name == self.component_name)
    }

    fn notification(&self, event: RefEvent) -> RefChangeNotification {
        RefChangeNotification {
            reference_name: self.metadata.name.clone(),
            event,
        }
    }

    fn notify_all(&self, events: Vec<RefEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<RefChangeListener> = self.listeners.read().values().cloned().collect();
        for event in events {
            tracing::debug!(
                reference = %self.metadata.name,
                component = %self.component_name,
                event = ?event,
                "Reference changed"
            );
            if listeners.is_empty() {
                continue;
            }
            let notification = self.notification(event);
            for listener in &listeners {
                listener(&notification);
            }
        }
    }
}

impl Drop for ReferenceManager {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}

impl std::fmt::Debug for ReferenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceManager")
            .field("name", &self.metadata.name)
            .field("component", &self.component_name)
            .field("filter", &self.filter.to_string())
            .finish()
    }
}
