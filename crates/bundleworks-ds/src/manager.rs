//! Enabled/disabled lifecycle of one component description

use crate::component_registry::ComponentRegistry;
use crate::configuration::ComponentConfiguration;
use bundleworks_core::{ComponentMetadata, FrameworkResult, LogLevel};
use bundleworks_framework::Bundle;
use bundleworks_logging::Logger;
use bundleworks_runtime::{
    AsyncWorkService, AtomicState, SingleInvokeTask, TransitionFuture, TransitionPromise,
    wait_or_invoke,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Configurations = Arc<OnceCell<Vec<Arc<ComponentConfiguration>>>>;

/// A transition future paired with the task that completes it
pub type PendingTransition = (TransitionFuture, Arc<SingleInvokeTask>);

pub(crate) enum ManagerState {
    Disabled {
        future: TransitionFuture,
        task: Arc<SingleInvokeTask>,
    },
    Enabled {
        future: TransitionFuture,
        task: Arc<SingleInvokeTask>,
        configurations: Configurations,
    },
}

impl ManagerState {
    fn pending(&self) -> PendingTransition {
        match self {
            Self::Disabled { future, task } | Self::Enabled { future, task, .. } => {
                (future.clone(), Arc::clone(task))
            }
        }
    }
}

/// Enables and disables a component description
///
/// Enabling posts creation of the component's configuration to the work
/// service; disabling posts its teardown. Both return a future right away.
/// Concurrent calls for the same transition share one future, and a
/// disable always waits for the enable it undoes.
pub struct ComponentManager {
    metadata: Arc<ComponentMetadata>,
    bundle: Arc<Bundle>,
    registry: Weak<ComponentRegistry>,
    logger: Arc<dyn Logger>,
    work: Arc<dyn AsyncWorkService>,
    state: AtomicState<ManagerState>,
    transition: Mutex<()>,
    disable_futures: Mutex<Vec<PendingTransition>>,
}

impl ComponentManager {
    /// Create a manager in the disabled state
    ///
    /// # Errors
    ///
    /// [`bundleworks_core::FrameworkError::Metadata`] when the description is
    /// inconsistent.
    pub fn new(
        metadata: Arc<ComponentMetadata>,
        bundle: Arc<Bundle>,
        registry: &Arc<ComponentRegistry>,
        logger: Arc<dyn Logger>,
        work: Arc<dyn AsyncWorkService>,
    ) -> FrameworkResult<Self> {
        metadata.validate()?;
        Ok(Self {
            metadata,
            bundle,
            registry: Arc::downgrade(registry),
            logger,
            work,
            state: AtomicState::new(ManagerState::Disabled {
                future: TransitionFuture::ready(),
                task: Arc::new(SingleInvokeTask::empty()),
            }),
            transition: Mutex::new(()),
            disable_futures: Mutex::new(Vec::new()),
        })
    }

    /// Enable the component if its description says it starts enabled
    ///
    /// Waits for the configuration to be created.
    ///
    /// # Errors
    ///
    /// [`bundleworks_core::FrameworkError::SharedLibrary`] when an immediate
    /// component's implementation cannot be loaded. Other failures are
    /// logged.
    pub fn initialize(&self) -> FrameworkResult<()> {
        if !self.metadata.enabled {
            return Ok(());
        }
        let (future, task) = self.enable_transition();
        match Self::wait_for_future(&future, &task) {
            Err(err) if err.is_shared_library() => Err(err),
            Err(err) => {
                self.logger.log_error(
                    LogLevel::Error,
                    &format!("Failed to enable component '{}'", self.metadata.name),
                    &err,
                );
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Enable the component; a no-op if it is already enabled
    pub fn enable(&self) -> TransitionFuture {
        self.enable_transition().0
    }

    /// Enable the component, returning the task that completes the future
    pub fn enable_transition(&self) -> PendingTransition {
        let mut current = self.state.load();
        if let ManagerState::Enabled { .. } = &*current {
            return current.pending();
        }

        let promise = TransitionPromise::new();
        let future = promise.future();
        let configurations: Configurations = Arc::new(OnceCell::new());
        let task = Arc::new(SingleInvokeTask::new({
            let metadata = Arc::clone(&self.metadata);
            let bundle = Arc::clone(&self.bundle);
            let registry = self.registry.clone();
            let logger = Arc::clone(&self.logger);
            let configurations = Arc::clone(&configurations);
            move || {
                let created =
                    create_configurations(metadata, bundle, registry, logger, &configurations);
                promise.fulfill(created);
            }
        }));
        let enabled = Arc::new(ManagerState::Enabled {
            future: future.clone(),
            task: Arc::clone(&task),
            configurations,
        });

        let _transition = self.transition.lock();
        loop {
            match self.state.compare_and_set(&current, Arc::clone(&enabled)) {
                Ok(()) => {
                    self.post(&task);
                    return (future, task);
                }
                Err(actual) => {
                    if let ManagerState::Enabled { .. } = &*actual {
                        return actual.pending();
                    }
                    current = actual;
                }
            }
        }
    }

    /// Disable the component; a no-op if it is already disabled
    pub fn disable(&self) -> TransitionFuture {
        self.disable_transition().0
    }

    /// Disable the component, returning the task that completes the future
    pub fn disable_transition(&self) -> PendingTransition {
        let mut current = self.state.load();
        if let ManagerState::Disabled { .. } = &*current {
            return current.pending();
        }

        let promise = TransitionPromise::new();
        let future = promise.future();
        // the enabled state being replaced, fixed before the swap is visible
        let replaced: Arc<Mutex<Option<Arc<ManagerState>>>> = Arc::new(Mutex::new(None));
        let task = Arc::new(SingleInvokeTask::new({
            let replaced = Arc::clone(&replaced);
            let logger = Arc::clone(&self.logger);
            let name = self.metadata.name.clone();
            move || {
                let previous = replaced.lock().take();
                if let Some(previous) = previous {
                    delete_configurations(&previous, logger.as_ref(), &name);
                }
                promise.succeed();
            }
        }));
        let disabled = Arc::new(ManagerState::Disabled {
            future: future.clone(),
            task: Arc::clone(&task),
        });

        let _transition = self.transition.lock();
        loop {
            *replaced.lock() = Some(Arc::clone(&current));
            match self.state.compare_and_set(&current, Arc::clone(&disabled)) {
                Ok(()) => {
                    self.accumulate_future(future.clone(), Arc::clone(&task));
                    self.post(&task);
                    return (future, task);
                }
                Err(actual) => {
                    if let ManagerState::Disabled { .. } = &*actual {
                        return actual.pending();
                    }
                    current = actual;
                }
            }
        }
    }

    fn post(&self, task: &Arc<SingleInvokeTask>) {
        let posted = Arc::clone(task);
        self.work.post(Box::new(move || {
            posted.invoke();
        }));
    }

    /// Remember a disable so drop can wait for it
    ///
    /// Reuses the slot of a disable that has already completed, so the list
    /// only grows while disables are outstanding.
    fn accumulate_future(&self, future: TransitionFuture, task: Arc<SingleInvokeTask>) {
        let mut pending = self.disable_futures.lock();
        match pending.iter_mut().find(|(f, _)| f.is_ready()) {
            Some(slot) => *slot = (future, task),
            None => pending.push((future, task)),
        }
    }

    /// Number of disable futures kept for drop
    pub fn pending_disable_count(&self) -> usize {
        self.disable_futures.lock().len()
    }

    /// Configurations of an enabled component, waiting for their creation
    pub fn get_component_configurations(&self) -> Vec<Arc<ComponentConfiguration>> {
        let current = self.state.load();
        let ManagerState::Enabled {
            future,
            task,
            configurations,
        } = &*current
        else {
            return Vec::new();
        };
        if let Err(err) = Self::wait_for_future(future, task) {
            self.logger.log_error(
                LogLevel::Debug,
                &format!("Component '{}' was enabled with errors", self.metadata.name),
                &err,
            );
        }
        configurations.get().cloned().unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        matches!(&*self.state.load(), ManagerState::Enabled { .. })
    }

    /// Wait for `future`, running `task` here if the pool is slow to start it
    pub fn wait_for_future(future: &TransitionFuture, task: &SingleInvokeTask) -> FrameworkResult<()> {
        wait_or_invoke(future, task)
    }

    pub fn get_metadata(&self) -> &Arc<ComponentMetadata> {
        &self.metadata
    }

    pub fn get_name(&self) -> &str {
        &self.metadata.name
    }

    pub fn get_bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    pub fn get_bundle_id(&self) -> u64 {
        self.bundle.id()
    }
}

fn create_configurations(
    metadata: Arc<ComponentMetadata>,
    bundle: Arc<Bundle>,
    registry: Weak<ComponentRegistry>,
    logger: Arc<dyn Logger>,
    slot: &OnceCell<Vec<Arc<ComponentConfiguration>>>,
) -> FrameworkResult<()> {
    let name = metadata.name.clone();
    let mut configurations = Vec::new();
    let mut outcome = Ok(());

    let initialized = ComponentConfiguration::new(metadata, bundle, registry, Arc::clone(&logger))
        .and_then(|configuration| {
            configurations.push(Arc::clone(&configuration));
            configuration.initialize()
        });
    if let Err(err) = initialized {
        logger.log_error(
            LogLevel::Error,
            &format!("Failed to create a configuration for component '{name}'"),
            &err,
        );
        if err.is_shared_library() {
            outcome = Err(err);
        }
    }

    // a configuration that failed to initialize is still torn down on disable
    let _ = slot.set(configurations);
    outcome
}

fn delete_configurations(previous: &ManagerState, logger: &dyn Logger, name: &str) {
    let ManagerState::Enabled {
        future,
        task,
        configurations,
    } = previous
    else {
        return;
    };
    if let Err(err) = wait_or_invoke(future, task) {
        logger.log_error(
            LogLevel::Debug,
            &format!("Disabling component '{name}' after a failed enable"),
            &err,
        );
    }
    for configuration in configurations.get().into_iter().flatten() {
        configuration.stop();
        configuration.deactivate();
    }
}

impl Drop for ComponentManager {
    fn drop(&mut self) {
        let _ = self.disable_transition();
        let pending = std::mem::take(&mut *self.disable_futures.lock());
        for (future, task) in pending {
            if let Err(err) = wait_or_invoke(&future, &task) {
                self.logger.log_error(
                    LogLevel::Error,
                    &format!("Failed to disable component '{}'", self.metadata.name),
                    &err,
                );
            }
        }
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("component", &self.metadata.name)
            .field("bundle", &self.bundle.id())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
#[path = "manager/manager_tests.rs"]
mod manager_tests;
