//! Central service registry

use crate::ldap::LdapFilter;
use crate::reference::ServiceReference;
use bundleworks_core::properties::{OBJECTCLASS, SERVICE_ID, SERVICE_SCOPE};
use bundleworks_core::{FrameworkError, FrameworkResult, Properties, ServiceScope};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A service object as handed to consumers
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Callback invoked for service events
pub type ServiceListener = Arc<dyn Fn(&ServiceEvent) + Send + Sync>;

/// Produces service objects on demand for each requesting bundle
pub trait ServiceFactory: Send + Sync {
    /// Create (or look up) the object handed to `requester`
    fn get_service(
        &self,
        requester: u64,
        registration: &ServiceRegistration,
    ) -> FrameworkResult<ServiceObject>;

    /// Release an object previously returned to `requester`
    fn unget_service(
        &self,
        _requester: u64,
        _registration: &ServiceRegistration,
        _service: ServiceObject,
    ) {
    }
}

/// Where the registry gets a service object from
#[derive(Clone)]
pub enum ServiceSource {
    Object(ServiceObject),
    Factory(Arc<dyn ServiceFactory>),
}

impl std::fmt::Debug for ServiceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceSource::Object(_) => write!(f, "ServiceSource::Object"),
            ServiceSource::Factory(_) => write!(f, "ServiceSource::Factory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEventKind {
    Registered,
    Modified,
    Unregistering,
}

/// Change notification delivered to service listeners
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    pub kind: ServiceEventKind,
    pub reference: ServiceReference,
    /// Reference snapshot before a `Modified` change
    pub previous: Option<ServiceReference>,
}

struct CachedService {
    object: ServiceObject,
    uses: usize,
}

struct ServiceEntry {
    reference: RwLock<ServiceReference>,
    source: ServiceSource,
    // factory results per requesting bundle
    cache: Mutex<HashMap<u64, CachedService>>,
}

struct ListenerEntry {
    filter: Option<LdapFilter>,
    callback: ServiceListener,
}

/// Registry of every service published in a framework
///
/// Events are delivered synchronously on the thread making the change,
/// after all registry locks have been released.
pub struct ServiceRegistry {
    services: DashMap<u64, Arc<ServiceEntry>>,
    listeners: RwLock<BTreeMap<u64, Arc<ListenerEntry>>>,
    next_service_id: AtomicU64,
    next_listener_id: AtomicU64,
    this: Weak<ServiceRegistry>,
}

impl ServiceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            services: DashMap::new(),
            listeners: RwLock::new(BTreeMap::new()),
            next_service_id: AtomicU64::new(1),
            next_listener_id: AtomicU64::new(1),
            this: this.clone(),
        })
    }

    /// Publish a service under `interfaces`
    ///
    /// `objectclass` and `service.id` are always overwritten;
    /// `service.scope` defaults to `singleton` when not supplied.
    pub fn register(
        &self,
        bundle_id: u64,
        interfaces: &[String],
        source: ServiceSource,
        properties: Properties,
    ) -> FrameworkResult<ServiceRegistration> {
        self.register_with(bundle_id, interfaces, source, properties, |_| {})
    }

    /// Publish a service, running `on_registered` before listeners hear of it
    ///
    /// The service is already visible to lookups when `on_registered` runs.
    /// Listeners may call back into the publisher; `on_registered` is where
    /// the publisher records the registration they will find.
    pub fn register_with<F>(
        &self,
        bundle_id: u64,
        interfaces: &[String],
        source: ServiceSource,
        mut properties: Properties,
        on_registered: F,
    ) -> FrameworkResult<ServiceRegistration>
    where
        F: FnOnce(&ServiceRegistration),
    {
        if interfaces.is_empty() || interfaces.iter().any(String::is_empty) {
            return Err(FrameworkError::ServiceRegistration(
                "a service needs at least one non-empty interface name".to_string(),
            ));
        }

        let id = self.next_service_id.fetch_add(1, Ordering::SeqCst);
        properties.insert(OBJECTCLASS.to_string(), serde_json::json!(interfaces));
        properties.insert(SERVICE_ID.to_string(), serde_json::json!(id));
        properties
            .entry(SERVICE_SCOPE.to_string())
            .or_insert_with(|| serde_json::json!(ServiceScope::Singleton.to_string()));

        let reference = ServiceReference::new(id, bundle_id, properties);
        self.services.insert(
            id,
            Arc::new(ServiceEntry {
                reference: RwLock::new(reference.clone()),
                source,
                cache: Mutex::new(HashMap::new()),
            }),
        );

        let registration = ServiceRegistration {
            id,
            bundle_id,
            registry: self.this.clone(),
        };
        on_registered(&registration);

        tracing::debug!(service_id = id, bundle_id, interfaces = ?interfaces, "Service registered");
        self.fire(ServiceEvent {
            kind: ServiceEventKind::Registered,
            reference,
            previous: None,
        });
        Ok(registration)
    }

    /// Remove a service; returns `false` if it was already gone
    pub fn unregister(&self, id: u64) -> bool {
        let Some((_, entry)) = self.services.remove(&id) else {
            return false;
        };
        let reference = entry.reference.read().clone();

        self.fire(ServiceEvent {
            kind: ServiceEventKind::Unregistering,
            reference: reference.clone(),
            previous: None,
        });

        if let ServiceSource::Factory(factory) = &entry.source {
            let cached: Vec<(u64, CachedService)> = entry.cache.lock().drain().collect();
            if !cached.is_empty() {
                let registration = ServiceRegistration {
                    id,
                    bundle_id: reference.bundle_id(),
                    registry: self.this.clone(),
                };
                for (requester, service) in cached {
                    factory.unget_service(requester, &registration, service.object);
                }
            }
        }

        tracing::debug!(service_id = id, "Service unregistered");
        true
    }

    /// Unregister everything published by `bundle_id`
    pub fn unregister_all(&self, bundle_id: u64) -> usize {
        let ids: Vec<u64> = self
            .services
            .iter()
            .filter(|entry| entry.value().reference.read().bundle_id() == bundle_id)
            .map(|entry| *entry.key())
            .collect();
        ids.into_iter().filter(|id| self.unregister(*id)).count()
    }

    /// Replace the properties of a registered service
    pub fn set_properties(&self, id: u64, mut properties: Properties) -> FrameworkResult<()> {
        let entry = self.entry(id).ok_or_else(|| not_registered(id))?;

        let (previous, current) = {
            let mut slot = entry.reference.write();
            let previous = slot.clone();
            for key in [OBJECTCLASS, SERVICE_ID, SERVICE_SCOPE] {
                if let Some(value) = previous.property(key) {
                    properties.insert(key.to_string(), value.clone());
                }
            }
            let current = ServiceReference::new(id, previous.bundle_id(), properties);
            *slot = current.clone();
            (previous, current)
        };

        self.fire(ServiceEvent {
            kind: ServiceEventKind::Modified,
            reference: current,
            previous: Some(previous),
        });
        Ok(())
    }

    /// Current reference for a service id
    pub fn reference(&self, id: u64) -> Option<ServiceReference> {
        self.entry(id).map(|entry| entry.reference.read().clone())
    }

    pub fn is_registered(&self, id: u64) -> bool {
        self.services.contains_key(&id)
    }

    /// Services registered under `interface` and matching `filter`, best first
    pub fn find(&self, interface: &str, filter: Option<&LdapFilter>) -> Vec<ServiceReference> {
        let mut found: Vec<ServiceReference> = self
            .services
            .iter()
            .map(|entry| entry.value().reference.read().clone())
            .filter(|reference| reference.has_interface(interface))
            .filter(|reference| filter.is_none_or(|f| f.matches(reference.properties())))
            .collect();
        found.sort();
        found
    }

    /// Resolve the service object for `requester`
    ///
    /// Returns `Ok(None)` when the service is no longer registered.
    pub fn get_service(
        &self,
        requester: u64,
        reference: &ServiceReference,
    ) -> FrameworkResult<Option<ServiceObject>> {
        let Some(entry) = self.entry(reference.id()) else {
            return Ok(None);
        };

        let factory = match &entry.source {
            ServiceSource::Object(object) => return Ok(Some(Arc::clone(object))),
            ServiceSource::Factory(factory) => Arc::clone(factory),
        };

        if let Some(cached) = entry.cache.lock().get_mut(&requester) {
            cached.uses += 1;
            return Ok(Some(Arc::clone(&cached.object)));
        }

        let registration = ServiceRegistration {
            id: reference.id(),
            bundle_id: reference.bundle_id(),
            registry: self.this.clone(),
        };
        // the factory runs without any registry lock held
        let object = factory.get_service(requester, &registration)?;

        let raced = {
            let mut cache = entry.cache.lock();
            match cache.entry(requester) {
                Entry::Occupied(mut occupied) => {
                    occupied.get_mut().uses += 1;
                    Some(Arc::clone(&occupied.get().object))
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(CachedService {
                        object: Arc::clone(&object),
                        uses: 1,
                    });
                    None
                }
            }
        };
        if let Some(existing) = raced {
            factory.unget_service(requester, &registration, object);
            return Ok(Some(existing));
        }

        if !self.is_registered(reference.id()) {
            let orphan = entry.cache.lock().remove(&requester);
            if let Some(orphan) = orphan {
                factory.unget_service(requester, &registration, orphan.object);
            }
            return Ok(None);
        }

        Ok(Some(object))
    }

    /// Release one use of a service object obtained through [`get_service`](Self::get_service)
    pub fn unget_service(&self, requester: u64, reference: &ServiceReference) -> bool {
        let Some(entry) = self.entry(reference.id()) else {
            return false;
        };
        let ServiceSource::Factory(factory) = &entry.source else {
            return true;
        };

        let released = {
            let mut cache = entry.cache.lock();
            match cache.get_mut(&requester) {
                None => return false,
                Some(cached) if cached.uses > 1 => {
                    cached.uses -= 1;
                    None
                }
                Some(_) => cache.remove(&requester),
            }
        };

        if let Some(released) = released {
            let registration = ServiceRegistration {
                id: reference.id(),
                bundle_id: reference.bundle_id(),
                registry: self.this.clone(),
            };
            factory.unget_service(requester, &registration, released.object);
        }
        true
    }

    /// Subscribe to service events, optionally restricted by `filter`
    pub fn add_listener(&self, filter: Option<LdapFilter>, callback: ServiceListener) -> u64 {
        let token = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .write()
            .insert(token, Arc::new(ListenerEntry { filter, callback }));
        token
    }

    pub fn remove_listener(&self, token: u64) -> bool {
        self.listeners.write().remove(&token).is_some()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    fn entry(&self, id: u64) -> Option<Arc<ServiceEntry>> {
        self.services.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn fire(&self, event: ServiceEvent) {
        let listeners: Vec<Arc<ListenerEntry>> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            let interested = match &listener.filter {
                None => true,
                Some(filter) => {
                    filter.matches(event.reference.properties())
                        || event
                            .previous
                            .as_ref()
                            .is_some_and(|previous| filter.matches(previous.properties()))
                }
            };
            if interested {
                (listener.callback)(&event);
            }
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

fn not_registered(id: u64) -> FrameworkError {
    FrameworkError::ServiceRegistration(format!("service {id} is not registered"))
}

/// Handle returned to the publisher of a service
#[derive(Clone)]
pub struct ServiceRegistration {
    id: u64,
    bundle_id: u64,
    registry: Weak<ServiceRegistry>,
}

impl ServiceRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bundle_id(&self) -> u64 {
        self.bundle_id
    }

    pub fn reference(&self) -> Option<ServiceReference> {
        self.registry.upgrade()?.reference(self.id)
    }

    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_registered(self.id))
    }

    pub fn set_properties(&self, properties: Properties) -> FrameworkResult<()> {
        let registry = self.registry.upgrade().ok_or_else(|| not_registered(self.id))?;
        registry.set_properties(self.id, properties)
    }

    /// Withdraw the service; returns `false` if it was already withdrawn
    pub fn unregister(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.unregister(self.id))
    }
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("id", &self.id)
            .field("bundle_id", &self.bundle_id)
            .finish()
    }
}
