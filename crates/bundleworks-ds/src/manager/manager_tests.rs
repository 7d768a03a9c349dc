#![allow(non_snake_case)]

use super::*;
use crate::test_support::{Behavior, GREETER_CLASS, Recorder, export_recording, install, memory_logger};
use bundleworks_core::{ComponentState, FrameworkError};
use bundleworks_framework::Framework;
use bundleworks_runtime::ManualWorkService;

struct Fixture {
    _framework: Framework,
    bundle: Arc<Bundle>,
    registry: Arc<ComponentRegistry>,
    recorder: Arc<Recorder>,
    work: Arc<ManualWorkService>,
}

impl Fixture {
    fn new() -> Self {
        let framework = Framework::new();
        let bundle = install(&framework, "greeter");
        let recorder = Recorder::new();
        export_recording(&bundle, GREETER_CLASS, &recorder, Behavior::default());
        Self {
            _framework: framework,
            bundle,
            registry: ComponentRegistry::new(),
            recorder,
            work: Arc::new(ManualWorkService::new()),
        }
    }

    fn manager(&self, metadata: ComponentMetadata) -> ComponentManager {
        ComponentManager::new(
            Arc::new(metadata),
            Arc::clone(&self.bundle),
            &self.registry,
            memory_logger(),
            self.work.clone(),
        )
        .unwrap()
    }
}

fn greeter() -> ComponentMetadata {
    ComponentMetadata::new(GREETER_CLASS).with_name("sample.Greeter")
}

#[test]
fn ComponentManager___new___starts_disabled() {
    let fixture = Fixture::new();

    let manager = fixture.manager(greeter());

    assert!(!manager.is_enabled());
    assert!(manager.get_component_configurations().is_empty());
    assert_eq!(manager.get_name(), "sample.Greeter");
    assert_eq!(manager.get_bundle_id(), fixture.bundle.id());
}

#[test]
fn ComponentManager___invalid_metadata___is_rejected() {
    let fixture = Fixture::new();

    let result = ComponentManager::new(
        Arc::new(greeter().with_name("")),
        Arc::clone(&fixture.bundle),
        &fixture.registry,
        memory_logger(),
        fixture.work.clone(),
    );

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

#[test]
fn ComponentManager___enable___posts_creation() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());

    let future = manager.enable();

    assert!(manager.is_enabled());
    assert!(!future.is_ready());
    assert_eq!(fixture.work.pending(), 1);

    fixture.work.run_pending();

    assert!(future.wait().is_ok());
    let configurations = manager.get_component_configurations();
    assert_eq!(configurations.len(), 1);
    assert_eq!(configurations[0].get_config_state(), ComponentState::Active);
}

#[test]
fn ComponentManager___enable_twice___shares_future() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());

    let first = manager.enable();
    let second = manager.enable();

    assert!(first.same_as(&second));
    assert_eq!(fixture.work.pending(), 1);
}

#[test]
fn ComponentManager___disable_when_disabled___is_ready_noop() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());

    let future = manager.disable();

    assert!(future.is_ready());
    assert_eq!(fixture.work.pending(), 0);
}

#[test]
fn ComponentManager___disable___tears_down_configuration() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());
    manager.enable();
    fixture.work.run_pending();
    let configuration = manager.get_component_configurations()[0].clone();

    let future = manager.disable();
    fixture.work.run_pending();

    assert!(future.wait().is_ok());
    assert!(!manager.is_enabled());
    assert_eq!(
        configuration.get_config_state(),
        ComponentState::UnsatisfiedReference
    );
    assert_eq!(fixture.recorder.count("deactivate"), 1);
}

#[test]
fn ComponentManager___disable_before_enable_runs___waits_for_enable() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());
    let enabled = manager.enable();

    let disabled = manager.disable();
    fixture.work.run_pending();

    assert!(enabled.wait().is_ok());
    assert!(disabled.wait().is_ok());
    assert_eq!(fixture.recorder.count("create"), 1);
    assert_eq!(fixture.recorder.count("deactivate"), 1);
}

#[test]
fn ComponentManager___stalled_pool___waiter_runs_posted_work() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());
    manager.enable();

    let (future, task) = manager.disable_transition();
    ComponentManager::wait_for_future(&future, &task).unwrap();

    assert_eq!(fixture.recorder.count("create"), 1);
    assert_eq!(fixture.recorder.count("deactivate"), 1);
    // both queued items were already run inline
    assert_eq!(fixture.work.run_pending(), 2);
    assert_eq!(fixture.recorder.count("create"), 1);
}

#[test]
fn ComponentManager___configurations_on_stalled_pool___are_created_inline() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());
    manager.enable();

    let configurations = manager.get_component_configurations();

    assert_eq!(configurations.len(), 1);
    assert_eq!(fixture.recorder.count("activate"), 1);
}

#[test]
fn ComponentManager___accumulated_disables___reuse_completed_slots() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());

    for _round in 0..3 {
        for _ in 0..3 {
            manager.enable();
            manager.disable();
        }
        assert_eq!(manager.pending_disable_count(), 3);
        fixture.work.run_pending();
    }

    assert_eq!(manager.pending_disable_count(), 3);
    assert_eq!(fixture.recorder.count("create"), 9);
    assert_eq!(fixture.recorder.count("deactivate"), 9);
}

#[test]
fn ComponentManager___initialize_disabled_by_default___stays_disabled() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter().with_enabled(false));

    manager.initialize().unwrap();

    assert!(!manager.is_enabled());
    assert_eq!(fixture.work.pending(), 0);
}

#[test]
fn ComponentManager___initialize_missing_class___is_shared_library_error() {
    let fixture = Fixture::new();
    let manager = fixture.manager(ComponentMetadata::new("sample::Missing"));

    let result = manager.initialize();

    assert!(matches!(result, Err(FrameworkError::SharedLibrary(_))));
    assert!(manager.is_enabled());
    assert_eq!(manager.get_component_configurations().len(), 1);
}

#[test]
fn ComponentManager___dropped___disables_on_stalled_pool() {
    let fixture = Fixture::new();
    let manager = fixture.manager(greeter());
    manager.enable();
    fixture.work.run_pending();

    drop(manager);

    assert_eq!(fixture.recorder.count("deactivate"), 1);
}
