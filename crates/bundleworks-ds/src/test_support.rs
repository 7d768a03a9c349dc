//! Fixtures shared by the unit tests

use crate::component::{ComponentClass, ComponentInstance};
use crate::context::ComponentContext;
use bundleworks_core::Properties;
use bundleworks_core::properties::SERVICE_RANKING;
use bundleworks_framework::{
    Bundle, Framework, ServiceObject, ServiceReference, ServiceRegistration, ServiceSource,
};
use bundleworks_logging::MemoryLogger;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

pub(crate) const GREETING: &str = "sample::Greeting";
pub(crate) const GREETER_CLASS: &str = "sample::Greeter";

pub(crate) fn install(framework: &Framework, name: &str) -> Arc<Bundle> {
    framework.install_bundle(name, serde_json::Value::Null)
}

pub(crate) fn memory_logger() -> Arc<MemoryLogger> {
    Arc::new(MemoryLogger::new())
}

pub(crate) fn ranked(ranking: i64) -> Properties {
    let mut properties = Properties::new();
    properties.insert(SERVICE_RANKING.to_string(), json!(ranking));
    properties
}

/// Register a plain `sample::Greeting` service from `bundle`
pub(crate) fn register_greeting(bundle: &Arc<Bundle>, ranking: i64) -> ServiceRegistration {
    register_service(bundle, GREETING, ranked(ranking))
}

pub(crate) fn register_service(
    bundle: &Arc<Bundle>,
    interface: &str,
    properties: Properties,
) -> ServiceRegistration {
    bundle
        .context()
        .register_service(
            &[interface.to_string()],
            ServiceSource::Object(Arc::new(format!("{interface} from {}", bundle.symbolic_name()))),
            properties,
        )
        .unwrap()
}

/// Hook calls made on [`RecordingComponent`]s, in order
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Behavior {
    pub(crate) fail_create: bool,
    pub(crate) fail_bind_references: bool,
    pub(crate) fail_activate: bool,
    pub(crate) fail_deactivate: bool,
}

pub(crate) struct RecordingComponent {
    recorder: Arc<Recorder>,
    behavior: Behavior,
}

impl ComponentInstance for RecordingComponent {
    fn create_instance(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        self.recorder.push("create");
        if self.behavior.fail_create {
            anyhow::bail!("constructor failed");
        }
        Ok(())
    }

    fn bind_references(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        self.recorder.push("bind_references");
        if self.behavior.fail_bind_references {
            anyhow::bail!("bind failed");
        }
        Ok(())
    }

    fn activate(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        self.recorder.push("activate");
        if self.behavior.fail_activate {
            anyhow::bail!("activate failed");
        }
        Ok(())
    }

    fn deactivate(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        self.recorder.push("deactivate");
        if self.behavior.fail_deactivate {
            anyhow::bail!("deactivate failed");
        }
        Ok(())
    }

    fn unbind_references(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        self.recorder.push("unbind_references");
        Ok(())
    }

    fn bind(
        &self,
        reference_name: &str,
        reference: &ServiceReference,
        _service: &ServiceObject,
    ) -> anyhow::Result<()> {
        self.recorder
            .push(format!("bind:{reference_name}:{}", reference.id()));
        Ok(())
    }

    fn unbind(&self, reference_name: &str, reference: &ServiceReference) -> anyhow::Result<()> {
        self.recorder
            .push(format!("unbind:{reference_name}:{}", reference.id()));
        Ok(())
    }

    fn service_object(&self) -> Option<ServiceObject> {
        Some(Arc::new("greeter instance".to_string()))
    }
}

/// Export a [`RecordingComponent`] class from `bundle` under `class`
pub(crate) fn export_recording(
    bundle: &Bundle,
    class: &str,
    recorder: &Arc<Recorder>,
    behavior: Behavior,
) {
    let recorder = Arc::clone(recorder);
    ComponentClass::from_fn(move || {
        Arc::new(RecordingComponent {
            recorder: Arc::clone(&recorder),
            behavior,
        }) as Arc<dyn ComponentInstance>
    })
    .export(bundle, class);
}
