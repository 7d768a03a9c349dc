#![allow(non_snake_case)]

use super::prelude::*;
use super::{ManualWorkService, MemoryLogger};
use serde_json::json;

struct Greeter;

impl ComponentInstance for Greeter {
    fn create_instance(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn service_object(&self) -> Option<ServiceObject> {
        Some(Arc::new(String::from("hello")))
    }
}

#[test]
fn prelude___greeter_component___is_served_through_registry() {
    let framework = Framework::new();
    let bundle = framework.install_bundle(
        "greeter",
        json!({
            "scr": {
                "version": 1,
                "components": [{
                    "name": "greeter",
                    "implementation-class": "greeter::Greeter",
                    "service": { "interfaces": ["greeter::Greeting"] }
                }]
            }
        }),
    );
    ComponentClass::from_fn(|| Arc::new(Greeter) as Arc<dyn ComponentInstance>)
        .export(&bundle, "greeter::Greeter");
    let ds = DeclarativeServices::new(
        Arc::new(MemoryLogger::new()),
        Arc::new(ManualWorkService::new()),
    );

    assert!(ds.bundle_started(&bundle).unwrap());

    let consumer = framework.install_bundle("consumer", serde_json::Value::Null);
    let context = consumer.context();
    let reference = context.get_service_reference("greeter::Greeting").unwrap();
    let service = context.get_service(&reference).unwrap().unwrap();
    assert_eq!(service.downcast_ref::<String>().map(String::as_str), Some("hello"));

    let scr = ds.service_component_runtime();
    let description = scr.get_component_description_dto(bundle.id(), "greeter").unwrap();
    let states: Vec<ComponentState> = scr
        .get_component_configuration_dtos(&description)
        .iter()
        .map(|configuration| configuration.state)
        .collect();
    assert_eq!(states, vec![ComponentState::Active]);
}
