//! Lifecycle of one component configuration

use crate::component::{ComponentClass, ComponentInstance};
use crate::component_registry::ComponentRegistry;
use crate::config_admin::{ConfigDependency, ConfigurationEvent, ConfigurationNotifier};
use crate::context::ComponentContext;
use crate::reference_manager::{RefChangeNotification, RefEvent, ReferenceManager};
use crate::registration::RegistrationManager;
use bundleworks_core::properties::{COMPONENT_ID, COMPONENT_NAME};
use bundleworks_core::{
    ComponentMetadata, ComponentState, FrameworkError, FrameworkResult, LogLevel, Properties,
    ServiceScope,
};
use bundleworks_framework::{
    Bundle, ServiceFactory, ServiceObject, ServiceReference, ServiceRegistration,
};
use bundleworks_logging::Logger;
use bundleworks_runtime::{AtomicState, CounterLatch, TransitionFuture, TransitionPromise};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

static NEXT_CONFIGURATION_ID: AtomicU64 = AtomicU64::new(1);

/// Called with `(from, to)` for every state change
pub(crate) type TransitionObserver = Arc<dyn Fn(ComponentState, ComponentState) + Send + Sync>;

/// An activated instance and the bundle it was created for
#[derive(Clone)]
pub(crate) struct LiveInstance {
    requester: u64,
    instance: Arc<dyn ComponentInstance>,
    context: Arc<ComponentContext>,
}

/// Internal state of a configuration
///
/// State objects are swapped in whole. The future each transient state
/// carries completes once the work of entering that state is done, so later
/// transitions can wait for it. Only the instance list of `Active` changes in
/// place.
pub(crate) enum ConfigurationState {
    Unsatisfied {
        /// Completes when the previous instances and service are torn down
        teardown: TransitionFuture,
        /// Thread running the teardown, if one is still running
        owner: Option<ThreadId>,
    },
    Satisfied {
        /// Completes when the provided service is registered
        registration: TransitionFuture,
        activations: CounterLatch,
    },
    Active {
        activations: CounterLatch,
        /// One instance for singletons, one per requesting bundle otherwise
        instances: Mutex<Vec<LiveInstance>>,
    },
}

impl ConfigurationState {
    fn unsatisfied() -> Arc<Self> {
        Arc::new(Self::Unsatisfied {
            teardown: TransitionFuture::ready(),
            owner: None,
        })
    }

    fn value(&self) -> ComponentState {
        match self {
            Self::Unsatisfied { .. } => ComponentState::UnsatisfiedReference,
            Self::Satisfied { .. } => ComponentState::Satisfied,
            Self::Active { .. } => ComponentState::Active,
        }
    }

    /// A teardown started further up this thread's stack
    fn torn_down_here(&self) -> bool {
        matches!(
            self,
            Self::Unsatisfied { teardown, owner: Some(owner) }
                if *owner == thread::current().id() && !teardown.is_ready()
        )
    }

    fn wait_for_transition_task(&self) {
        if self.torn_down_here() {
            return;
        }
        let pending = match self {
            Self::Unsatisfied { teardown, .. } => teardown,
            Self::Satisfied { registration, .. } => registration,
            Self::Active { .. } => return,
        };
        // failures were logged by whoever ran the transition
        let _ = pending.wait();
    }
}

/// One configuration of a component
///
/// Listens to its reference managers (and to configuration data, when the
/// component declares a configuration policy) and moves between
/// `UNSATISFIED_REFERENCE`, `SATISFIED` and `ACTIVE`:
///
/// - references and configuration satisfied: register the provided service
///   (and activate straight away for immediate components)
/// - `get_service` on a delayed component: create and activate an instance,
///   shared by everyone for singletons and per requesting bundle otherwise
/// - anything unsatisfied: unregister, wait for in-flight activations,
///   destroy every instance
///
/// Concurrent callers race with compare-and-set on the state; exactly one of
/// them performs each transition and the rest wait for its future.
/// Listeners run synchronously, so a transition may re-enter this
/// configuration on the same thread. Such a call never waits for the
/// transition below it on the stack: a re-entrant register is deferred
/// until the teardown it would wait for has finished.
pub struct ComponentConfiguration {
    id: u64,
    metadata: Arc<ComponentMetadata>,
    bundle: Arc<Bundle>,
    registry: Weak<ComponentRegistry>,
    logger: Arc<dyn Logger>,
    state: AtomicState<ConfigurationState>,
    reference_managers: BTreeMap<String, Arc<ReferenceManager>>,
    listener_tokens: Mutex<Vec<(Arc<ReferenceManager>, u64)>>,
    config: Option<ConfigDependency>,
    config_tokens: Mutex<Vec<(Arc<ConfigurationNotifier>, String, u64)>>,
    registration: Option<RegistrationManager>,
    initialized: AtomicBool,
    deferred_register: AtomicBool,
    creation: Mutex<()>,
    observer: RwLock<Option<TransitionObserver>>,
    this: Weak<ComponentConfiguration>,
}

impl ComponentConfiguration {
    /// Create a configuration in `UNSATISFIED_REFERENCE`
    ///
    /// Reference managers start tracking immediately but nothing reacts to
    /// them until [`ComponentConfiguration::initialize`] is called.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::InvalidFilter`] for a bad reference target and
    /// [`FrameworkError::InvalidArgument`] for a service with no interfaces.
    pub fn new(
        metadata: Arc<ComponentMetadata>,
        bundle: Arc<Bundle>,
        registry: Weak<ComponentRegistry>,
        logger: Arc<dyn Logger>,
    ) -> FrameworkResult<Arc<Self>> {
        let context = bundle.context();

        let mut reference_managers = BTreeMap::new();
        for reference in &metadata.references {
            let manager = ReferenceManager::new(
                reference.clone(),
                context.clone(),
                Arc::clone(&logger),
                metadata.name.clone(),
            )?;
            reference_managers.insert(reference.name.clone(), manager);
        }

        let registration = match &metadata.service {
            Some(service) => Some(RegistrationManager::new(
                context,
                service.interfaces.clone(),
                service.scope,
            )?),
            None => None,
        };
        let config = ConfigDependency::new(&metadata);

        Ok(Arc::new_cyclic(|this| Self {
            id: NEXT_CONFIGURATION_ID.fetch_add(1, Ordering::Relaxed),
            metadata,
            bundle,
            registry,
            logger,
            state: AtomicState::from_arc(ConfigurationState::unsatisfied()),
            reference_managers,
            listener_tokens: Mutex::new(Vec::new()),
            config,
            config_tokens: Mutex::new(Vec::new()),
            registration,
            initialized: AtomicBool::new(false),
            deferred_register: AtomicBool::new(false),
            creation: Mutex::new(()),
            observer: RwLock::new(None),
            this: this.clone(),
        }))
    }

    /// Start reacting to reference and configuration changes
    ///
    /// Registers the provided service when every reference is already
    /// satisfied (or there are none) and any required configuration is
    /// present.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::SharedLibrary`] when an immediate component's
    /// implementation cannot be loaded.
    pub fn initialize(&self) -> FrameworkResult<()> {
        for manager in self.reference_managers.values() {
            let weak = self.this.clone();
            let token = manager.register_listener(Arc::new(
                move |notification: &RefChangeNotification| {
                    if let Some(configuration) = weak.upgrade() {
                        configuration.ref_changed_state(notification);
                    }
                },
            ));
            self.listener_tokens.lock().push((Arc::clone(manager), token));
        }
        if let Some(config) = &self.config {
            self.track_configuration(config);
        }

        self.initialized.store(true, Ordering::Release);
        if self.is_satisfied() {
            self.register()?;
        }
        Ok(())
    }

    /// Listen to our pids first so no update between the two steps is lost
    fn track_configuration(&self, config: &ConfigDependency) {
        let Some(registry) = self.registry.upgrade() else {
            self.logger.log(
                LogLevel::Warn,
                &format!(
                    "Component '{}' depends on configuration but has no configuration source",
                    self.metadata.name
                ),
            );
            return;
        };
        let notifier = Arc::clone(registry.configuration_notifier());
        for pid in config.pids() {
            let weak = self.this.clone();
            let token = notifier.register_listener(
                pid,
                Arc::new(move |event: &ConfigurationEvent| {
                    if let Some(configuration) = weak.upgrade() {
                        configuration.config_changed_state(event);
                    }
                }),
            );
            self.config_tokens
                .lock()
                .push((Arc::clone(&notifier), pid.clone(), token));
        }
        config.refresh(&notifier);
    }

    /// Stop listening to reference managers and configuration data, and
    /// stop reference tracking
    pub fn stop(&self) {
        self.initialized.store(false, Ordering::Release);
        let tokens = std::mem::take(&mut *self.listener_tokens.lock());
        for (manager, token) in tokens {
            manager.unregister_listener(token);
        }
        let tokens = std::mem::take(&mut *self.config_tokens.lock());
        for (notifier, pid, token) in tokens {
            notifier.unregister_listener(&pid, token);
        }
        for manager in self.reference_managers.values() {
            manager.stop_tracking();
        }
    }

    fn are_references_satisfied(&self) -> bool {
        self.reference_managers.values().all(|m| m.is_satisfied())
    }

    fn is_config_satisfied(&self) -> bool {
        self.config
            .as_ref()
            .is_none_or(ConfigDependency::is_satisfied)
    }

    fn is_satisfied(&self) -> bool {
        self.is_config_satisfied() && self.are_references_satisfied()
    }

    fn is_scoped(&self) -> bool {
        self.metadata
            .service
            .as_ref()
            .is_some_and(|service| service.scope != ServiceScope::Singleton)
    }

    fn ref_changed_state(&self, notification: &RefChangeNotification) {
        match &notification.event {
            RefEvent::BecameSatisfied => self.ref_satisfied(&notification.reference_name),
            RefEvent::BecameUnsatisfied => self.ref_unsatisfied(&notification.reference_name),
            RefEvent::Rebind { bind, unbind } => {
                self.rebind(&notification.reference_name, bind.as_ref(), unbind.as_ref());
            }
        }
    }

    fn ref_satisfied(&self, reference_name: &str) {
        if !self.initialized.load(Ordering::Acquire) || !self.is_config_satisfied() {
            return;
        }
        let others_satisfied = self
            .reference_managers
            .iter()
            .filter(|(name, _)| name.as_str() != reference_name)
            .all(|(_, manager)| manager.is_satisfied());
        if !others_satisfied {
            return;
        }
        self.register_logged(&format!("reference '{reference_name}' became satisfied"));
    }

    fn ref_unsatisfied(&self, reference_name: &str) {
        if self.reference_managers.contains_key(reference_name) {
            self.deactivate();
        }
    }

    fn config_changed_state(&self, event: &ConfigurationEvent) {
        let Some(config) = &self.config else {
            return;
        };
        let (was_satisfied, now_satisfied) = config.apply(event);
        if !self.initialized.load(Ordering::Acquire) {
            return;
        }
        tracing::debug!(
            component = %self.metadata.name,
            configuration = self.id,
            pid = %event.pid,
            kind = ?event.kind,
            was_satisfied,
            now_satisfied,
            "Configuration data changed"
        );

        match (was_satisfied, now_satisfied) {
            (true, true) => {
                // new properties take effect through a fresh registration
                self.deactivate();
                if self.is_satisfied() {
                    self.register_logged(&format!("configuration '{}' changed", event.pid));
                }
            }
            (false, true) => {
                if self.are_references_satisfied() {
                    self.register_logged(&format!("configuration '{}' arrived", event.pid));
                }
            }
            (true, false) => self.deactivate(),
            (false, false) => {}
        }
    }

    fn register_logged(&self, cause: &str) {
        if let Err(err) = self.register() {
            self.logger.log_error(
                LogLevel::Error,
                &format!(
                    "Failed to register component '{}' after {cause}",
                    self.metadata.name
                ),
                &err,
            );
        }
    }

    /// Hand a dynamic rebind to every live instance
    fn rebind(
        &self,
        reference_name: &str,
        bind: Option<&ServiceReference>,
        unbind: Option<&ServiceReference>,
    ) {
        let current = self.state.load();
        let ConfigurationState::Active {
            activations,
            instances,
        } = &*current
        else {
            return;
        };
        // refused once deactivation has started
        let Some(_in_flight) = activations.enter() else {
            return;
        };

        let live = instances.lock().clone();
        for LiveInstance {
            instance, context, ..
        } in &live
        {
            if let Some(reference) = bind
                && let Some(service) = context.add_to_bound_services(reference_name, reference)
                && let Err(err) = instance.bind(reference_name, reference, &service)
            {
                self.logger.log_error(
                    LogLevel::Error,
                    &format!(
                        "Bind of reference '{reference_name}' failed for component '{}'",
                        self.metadata.name
                    ),
                    &*err,
                );
            }
            if let Some(reference) = unbind {
                if let Err(err) = instance.unbind(reference_name, reference) {
                    self.logger.log_error(
                        LogLevel::Error,
                        &format!(
                            "Unbind of reference '{reference_name}' failed for component '{}'",
                            self.metadata.name
                        ),
                        &*err,
                    );
                }
                context.remove_from_bound_services(reference_name, reference);
            }
        }
    }

    /// Move from `UNSATISFIED_REFERENCE` to `SATISFIED`
    ///
    /// A no-op in any other state, and when a reference or the required
    /// configuration turns out to be missing once the transition is won.
    /// The caller that wins the transition registers the provided service;
    /// immediate components are then activated on the same thread.
    ///
    /// # Errors
    ///
    /// The registry's error when the service cannot be registered (the
    /// configuration falls back to `UNSATISFIED_REFERENCE`) and
    /// [`FrameworkError::SharedLibrary`] when an immediate component's
    /// implementation cannot be loaded.
    pub fn register(&self) -> FrameworkResult<()> {
        loop {
            let current = self.state.load();
            let ConfigurationState::Unsatisfied { teardown, .. } = &*current else {
                return Ok(());
            };
            if current.torn_down_here() {
                self.deferred_register.store(true, Ordering::Release);
                return Ok(());
            }
            // the previous instance must be gone before the service reappears
            let _ = teardown.wait();

            let promise = TransitionPromise::new();
            let satisfied = Arc::new(ConfigurationState::Satisfied {
                registration: promise.future(),
                activations: CounterLatch::new(),
            });
            if self
                .state
                .compare_and_set(&current, Arc::clone(&satisfied))
                .is_err()
            {
                continue;
            }

            // a dependency lost between the caller's check and the swap found
            // nothing to deactivate
            if !self.is_satisfied() {
                promise.succeed();
                let _ = self
                    .state
                    .compare_and_set(&satisfied, ConfigurationState::unsatisfied());
                return Ok(());
            }
            self.record_transition(ComponentState::UnsatisfiedReference, ComponentState::Satisfied);

            let mut pending = Some(promise);
            let registered = self.register_service(|| {
                if let Some(promise) = pending.take() {
                    promise.succeed();
                }
            });
            if let Err(err) = registered {
                self.logger.log_error(
                    LogLevel::Error,
                    &format!(
                        "Failed to register the service of component '{}'",
                        self.metadata.name
                    ),
                    &err,
                );
                if let Some(promise) = pending.take() {
                    promise.fulfill(Err(err.clone()));
                }
                if self
                    .state
                    .compare_and_set(&satisfied, ConfigurationState::unsatisfied())
                    .is_ok()
                {
                    self.record_transition(
                        ComponentState::Satisfied,
                        ComponentState::UnsatisfiedReference,
                    );
                }
                return Err(err);
            }
            if let Some(promise) = pending.take() {
                promise.succeed();
            }

            if self.metadata.immediate {
                self.activate(self.bundle.id())?;
            }
            return Ok(());
        }
    }

    /// `on_registered` runs before service listeners are told
    fn register_service<F>(&self, on_registered: F) -> FrameworkResult<()>
    where
        F: FnOnce(),
    {
        let Some(registration) = &self.registration else {
            return Ok(());
        };
        let factory = Arc::new(ConfigurationServiceFactory {
            configuration: self.this.clone(),
            component_name: self.metadata.name.clone(),
        });
        registration.register_service(factory, self.get_properties(), on_registered)
    }

    fn unregister_service(&self) {
        if let Some(registration) = &self.registration
            && registration.is_service_registered()
            && let Err(err) = registration.unregister_service()
        {
            self.logger.log_error(
                LogLevel::Warn,
                &format!(
                    "Failed to unregister the service of component '{}'",
                    self.metadata.name
                ),
                &err,
            );
        }
    }

    /// Get an activated instance for `requester`
    ///
    /// Singletons share one instance, created on the first call. Bundle and
    /// prototype scoped components get a new instance per call; the registry
    /// calls once per requesting bundle.
    ///
    /// Returns `None` when the configuration is not satisfied, is being
    /// deactivated, or the instance failed to come up (the failure is
    /// logged).
    ///
    /// # Errors
    ///
    /// [`FrameworkError::SharedLibrary`] when the implementation cannot be
    /// loaded from the bundle.
    pub fn activate(&self, requester: u64) -> FrameworkResult<Option<Arc<dyn ComponentInstance>>> {
        loop {
            let current = self.state.load();
            match &*current {
                ConfigurationState::Unsatisfied { .. } => {
                    self.logger.log(
                        LogLevel::Debug,
                        &format!(
                            "Component '{}' is not satisfied, nothing to activate",
                            self.metadata.name
                        ),
                    );
                    return Ok(None);
                }
                ConfigurationState::Active {
                    activations,
                    instances,
                } => {
                    let Some(_in_flight) = activations.enter() else {
                        return Ok(None);
                    };
                    if !self.is_scoped() {
                        return Ok(instances
                            .lock()
                            .first()
                            .map(|live| Arc::clone(&live.instance)));
                    }
                    // deactivation waits for us before it drains the list
                    let Some(live) = self.create_and_activate(requester)? else {
                        return Ok(None);
                    };
                    let instance = Arc::clone(&live.instance);
                    instances.lock().push(live);
                    return Ok(Some(instance));
                }
                ConfigurationState::Satisfied { activations, .. } => {
                    let Some(_in_flight) = activations.enter() else {
                        return Ok(None);
                    };
                    let _creating = self.creation.lock();
                    if !Arc::ptr_eq(&self.state.load(), &current) {
                        continue;
                    }

                    let Some(live) = self.create_and_activate(requester)? else {
                        return Ok(None);
                    };
                    let instance = Arc::clone(&live.instance);
                    let active = Arc::new(ConfigurationState::Active {
                        activations: CounterLatch::new(),
                        instances: Mutex::new(vec![live.clone()]),
                    });
                    if self.state.compare_and_set(&current, active).is_err() {
                        self.logger.log(
                            LogLevel::Warn,
                            &format!(
                                "Activation of component '{}' abandoned, it is no longer satisfied",
                                self.metadata.name
                            ),
                        );
                        self.destroy(&live);
                        return Ok(None);
                    }
                    self.record_transition(ComponentState::Satisfied, ComponentState::Active);
                    return Ok(Some(instance));
                }
            }
        }
    }

    /// Destroy the instance a bundle or prototype scoped service created for
    /// `requester`
    ///
    /// A no-op for singletons and while the configuration is not active.
    pub fn unget(&self, requester: u64) {
        if !self.is_scoped() {
            return;
        }
        let current = self.state.load();
        let ConfigurationState::Active {
            activations,
            instances,
        } = &*current
        else {
            return;
        };
        // once deactivation has started it destroys the instance instead
        let Some(_in_flight) = activations.enter() else {
            return;
        };
        let released = {
            let mut instances = instances.lock();
            instances
                .iter()
                .rposition(|live| live.requester == requester)
                .map(|index| instances.remove(index))
        };
        if let Some(live) = released {
            self.destroy(&live);
        }
    }

    fn create_and_activate(&self, requester: u64) -> FrameworkResult<Option<LiveInstance>> {
        let class = match ComponentClass::load(&self.bundle, &self.metadata.implementation_class) {
            Ok(class) => class,
            Err(err) => {
                self.logger.log_error(
                    LogLevel::Error,
                    &format!(
                        "Failed to load implementation of component '{}'",
                        self.metadata.name
                    ),
                    &err,
                );
                return Err(err);
            }
        };

        let instance = class.new_instance();
        let context = Arc::new(ComponentContext::new(
            Arc::clone(&self.bundle),
            requester,
            self.get_properties(),
            self.registry.clone(),
            Arc::clone(&self.logger),
        ));
        context.bind_initial(&self.get_all_dependency_managers());

        if let Err(err) = instance.create_instance(&context) {
            self.logger.log_error(
                LogLevel::Error,
                &format!(
                    "Failed to create an instance of component '{}'",
                    self.metadata.name
                ),
                &*err,
            );
            context.invalidate();
            return Ok(None);
        }
        if let Err(err) = instance.bind_references(&context) {
            self.logger.log_error(
                LogLevel::Error,
                &format!(
                    "Failed to bind references of component '{}'",
                    self.metadata.name
                ),
                &*err,
            );
        }
        if let Err(err) = instance.activate(&context) {
            self.logger.log_error(
                LogLevel::Error,
                &format!("Failed to activate component '{}'", self.metadata.name),
                &*err,
            );
            context.invalidate();
            return Ok(None);
        }
        Ok(Some(LiveInstance {
            requester,
            instance,
            context,
        }))
    }

    fn destroy(&self, live: &LiveInstance) {
        let LiveInstance {
            instance, context, ..
        } = live;
        if let Err(err) = instance.deactivate(context) {
            self.logger.log_error(
                LogLevel::Error,
                &format!("Failed to deactivate component '{}'", self.metadata.name),
                &*err,
            );
        }
        if let Err(err) = instance.unbind_references(context) {
            self.logger.log_error(
                LogLevel::Error,
                &format!(
                    "Failed to unbind references of component '{}'",
                    self.metadata.name
                ),
                &*err,
            );
        }
        context.invalidate();
    }

    /// Return to `UNSATISFIED_REFERENCE`
    ///
    /// The winning caller unregisters the service, waits for in-flight
    /// activations and destroys every instance. Other callers wait for that
    /// teardown to finish, unless it is running further up their own stack.
    pub fn deactivate(&self) {
        loop {
            let current = self.state.load();
            if let ConfigurationState::Unsatisfied { .. } = &*current {
                current.wait_for_transition_task();
                return;
            }

            let promise = TransitionPromise::new();
            let unsatisfied = Arc::new(ConfigurationState::Unsatisfied {
                teardown: promise.future(),
                owner: Some(thread::current().id()),
            });
            if self.state.compare_and_set(&current, unsatisfied).is_err() {
                continue;
            }
            self.record_transition(current.value(), ComponentState::UnsatisfiedReference);

            match &*current {
                ConfigurationState::Satisfied {
                    registration,
                    activations,
                } => {
                    // completed before any listener could call back in
                    let _ = registration.wait();
                    self.unregister_service();
                    activations.wait();
                }
                ConfigurationState::Active {
                    activations,
                    instances,
                } => {
                    self.unregister_service();
                    activations.wait();
                    let instances = std::mem::take(&mut *instances.lock());
                    for live in &instances {
                        self.destroy(live);
                    }
                }
                ConfigurationState::Unsatisfied { .. } => {}
            }
            promise.succeed();

            if self.deferred_register.swap(false, Ordering::AcqRel)
                && self.initialized.load(Ordering::Acquire)
                && self.is_satisfied()
            {
                self.register_logged("a deferred satisfaction change");
            }
            return;
        }
    }

    fn record_transition(&self, from: ComponentState, to: ComponentState) {
        tracing::debug!(
            component = %self.metadata.name,
            configuration = self.id,
            %from,
            %to,
            "Component configuration changed state"
        );
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(from, to);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_transition_observer(&self, observer: TransitionObserver) {
        *self.observer.write() = Some(observer);
    }

    pub fn get_all_dependency_managers(&self) -> Vec<Arc<ReferenceManager>> {
        self.reference_managers.values().cloned().collect()
    }

    pub fn get_dependency_manager(&self, reference_name: &str) -> Option<Arc<ReferenceManager>> {
        self.reference_managers.get(reference_name).cloned()
    }

    /// Reference to the registered service, if the component provides one
    /// and it is currently registered
    pub fn get_service_reference(&self) -> Option<ServiceReference> {
        self.registration
            .as_ref()
            .and_then(RegistrationManager::get_service_reference)
    }

    /// Component properties overlaid with configuration data, plus
    /// `component.name` and `component.id`
    pub fn get_properties(&self) -> Properties {
        let mut properties = self.metadata.properties.clone();
        if let Some(config) = &self.config {
            config.merge_into(&mut properties);
        }
        properties.insert(
            COMPONENT_NAME.to_string(),
            serde_json::json!(self.metadata.name),
        );
        properties.insert(COMPONENT_ID.to_string(), serde_json::json!(self.id));
        properties
    }

    pub fn get_bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_metadata(&self) -> &Arc<ComponentMetadata> {
        &self.metadata
    }

    /// Current state, after any transition in progress has finished
    ///
    /// `UNSATISFIED_CONFIGURATION` while required configuration data is
    /// missing.
    pub fn get_config_state(&self) -> ComponentState {
        let current = self.state.load();
        current.wait_for_transition_task();
        match current.value() {
            ComponentState::UnsatisfiedReference if !self.is_config_satisfied() => {
                ComponentState::UnsatisfiedConfiguration
            }
            state => state,
        }
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        match &*self.state.load() {
            ConfigurationState::Active { instances, .. } => instances.lock().len(),
            _ => 0,
        }
    }
}

impl Drop for ComponentConfiguration {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ComponentConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentConfiguration")
            .field("id", &self.id)
            .field("component", &self.metadata.name)
            .field("state", &self.state.load().value())
            .finish()
    }
}

/// Activates the configuration when a consumer asks for its service
struct ConfigurationServiceFactory {
    configuration: Weak<ComponentConfiguration>,
    component_name: String,
}

impl ServiceFactory for ConfigurationServiceFactory {
    fn get_service(
        &self,
        requester: u64,
        _registration: &ServiceRegistration,
    ) -> FrameworkResult<ServiceObject> {
        let configuration = self.configuration.upgrade().ok_or_else(|| {
            FrameworkError::ComponentFailure(format!(
                "component '{}' has been disposed",
                self.component_name
            ))
        })?;
        let instance = configuration.activate(requester)?.ok_or_else(|| {
            FrameworkError::ComponentFailure(format!(
                "component '{}' could not be activated",
                self.component_name
            ))
        })?;
        instance.service_object().ok_or_else(|| {
            FrameworkError::ComponentFailure(format!(
                "component '{}' provides no service object",
                self.component_name
            ))
        })
    }

    fn unget_service(
        &self,
        requester: u64,
        _registration: &ServiceRegistration,
        _service: ServiceObject,
    ) {
        if let Some(configuration) = self.configuration.upgrade() {
            configuration.unget(requester);
        }
    }
}
